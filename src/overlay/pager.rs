use crate::overlay::messages::{parse_warning_payload, OverlayIntent};
use std::time::{Duration, Instant};

/// Half of the opacity pulse loop: 600ms fading out, 600ms fading back in.
const PULSE_HALF_PERIOD: Duration = Duration::from_millis(600);
const PULSE_MIN_OPACITY: f32 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagerState {
    /// No warnings to display; only the close action is available.
    Empty,
    /// More pages follow the current one.
    Paging,
    /// The final page; the forward action becomes "Open App".
    LastPage,
}

/// What a forward/close tap amounts to. `Advanced` means the page index moved
/// and the overlay should repaint; intents are forwarded to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TapOutcome {
    Advanced,
    Intent(OverlayIntent),
    Ignored,
}

/// Paging state for one overlay session. Owns the warning list and the current
/// index; translates taps into intents but never executes them.
#[derive(Debug)]
pub struct WarningPager {
    target_id: String,
    warnings: Vec<String>,
    index: usize,
    pulse_origin: Instant,
}

impl WarningPager {
    pub fn from_payload(target_id: impl Into<String>, warnings_json: &str) -> Self {
        Self::new(target_id, parse_warning_payload(warnings_json))
    }

    pub fn new(target_id: impl Into<String>, warnings: Vec<String>) -> Self {
        Self {
            target_id: target_id.into(),
            warnings,
            index: 0,
            pulse_origin: Instant::now(),
        }
    }

    pub fn state(&self) -> PagerState {
        match self.warnings.len() {
            0 => PagerState::Empty,
            len if self.index + 1 >= len => PagerState::LastPage,
            _ => PagerState::Paging,
        }
    }

    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn current_warning(&self) -> Option<&str> {
        self.warnings.get(self.index).map(String::as_str)
    }

    /// Fraction of warnings seen so far, `(index + 1) / len`. Zero when empty.
    pub fn progress(&self) -> f32 {
        if self.warnings.is_empty() {
            0.0
        } else {
            (self.index + 1) as f32 / self.warnings.len() as f32
        }
    }

    /// Replace the session content in place. Always resets to the first page;
    /// the window itself is untouched by design (no recreate, no flicker).
    pub fn replace_content(&mut self, target_id: impl Into<String>, warnings_json: &str) {
        self.target_id = target_id.into();
        self.warnings = parse_warning_payload(warnings_json);
        self.index = 0;
        tracing::debug!(
            target_id = %self.target_id,
            warnings = self.warnings.len(),
            "overlay content replaced"
        );
    }

    /// Forward tap ("Next" / "Open App"). On the last page this emits the
    /// allow intent instead of moving the index; with no warnings it is a
    /// no-op since the empty view renders no forward button.
    pub fn tap_forward(&mut self) -> TapOutcome {
        match self.state() {
            PagerState::Empty => TapOutcome::Ignored,
            PagerState::Paging => {
                self.index += 1;
                TapOutcome::Advanced
            }
            PagerState::LastPage => TapOutcome::Intent(OverlayIntent::Allow {
                target_id: self.target_id.clone(),
            }),
        }
    }

    /// Close tap; valid from every state, including `Empty`.
    pub fn tap_close(&mut self) -> TapOutcome {
        TapOutcome::Intent(OverlayIntent::Close)
    }

    /// Opacity of the warning text at `now`: a triangle wave cycling
    /// 1.0 -> 0.3 -> 1.0 over two half-periods of 600ms each.
    pub fn pulse_opacity(&self, now: Instant) -> f32 {
        let elapsed = now.saturating_duration_since(self.pulse_origin);
        let half = PULSE_HALF_PERIOD.as_millis() as u64;
        let phase = elapsed.as_millis() as u64 % (half * 2);
        let t = if phase < half {
            phase as f32 / half as f32
        } else {
            1.0 - (phase - half) as f32 / half as f32
        };
        1.0 - t * (1.0 - PULSE_MIN_OPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::{PagerState, TapOutcome, WarningPager};
    use crate::overlay::messages::OverlayIntent;
    use std::time::Duration;

    fn pager(n: usize) -> WarningPager {
        let warnings = (0..n).map(|i| format!("warning {i}")).collect();
        WarningPager::new("com.example.video", warnings)
    }

    #[test]
    fn n_forward_taps_reach_allow() {
        for n in 1..6 {
            let mut p = pager(n);
            for _ in 0..n - 1 {
                assert_eq!(p.tap_forward(), TapOutcome::Advanced);
            }
            assert_eq!(p.state(), PagerState::LastPage);
            assert_eq!(
                p.tap_forward(),
                TapOutcome::Intent(OverlayIntent::Allow {
                    target_id: "com.example.video".into()
                }),
                "set of {n} warnings should allow on tap {n}"
            );
        }
    }

    #[test]
    fn single_warning_starts_on_last_page() {
        let p = pager(1);
        assert_eq!(p.state(), PagerState::LastPage);
        assert_eq!(p.progress(), 1.0);
    }

    #[test]
    fn empty_set_ignores_forward_but_still_closes() {
        let mut p = pager(0);
        assert_eq!(p.state(), PagerState::Empty);
        assert_eq!(p.tap_forward(), TapOutcome::Ignored);
        assert_eq!(p.tap_close(), TapOutcome::Intent(OverlayIntent::Close));
        assert_eq!(p.progress(), 0.0);
    }

    #[test]
    fn close_works_mid_paging() {
        let mut p = pager(3);
        assert_eq!(p.tap_forward(), TapOutcome::Advanced);
        assert_eq!(p.tap_close(), TapOutcome::Intent(OverlayIntent::Close));
    }

    #[test]
    fn progress_follows_index() {
        let mut p = pager(2);
        assert_eq!(p.state(), PagerState::Paging);
        assert_eq!(p.progress(), 0.5);
        assert_eq!(p.tap_forward(), TapOutcome::Advanced);
        assert_eq!(p.state(), PagerState::LastPage);
        assert_eq!(p.progress(), 1.0);
        assert_eq!(p.current_warning(), Some("warning 1"));
    }

    #[test]
    fn replace_content_resets_index_and_target() {
        let mut p = pager(3);
        p.tap_forward();
        p.tap_forward();
        assert_eq!(p.index(), 2);

        p.replace_content("com.example.other", r#"["a", "b"]"#);
        assert_eq!(p.index(), 0);
        assert_eq!(p.target_id(), "com.example.other");
        assert_eq!(p.len(), 2);
        assert_eq!(p.state(), PagerState::Paging);
    }

    #[test]
    fn replace_with_malformed_payload_goes_empty() {
        let mut p = pager(2);
        p.replace_content("com.example.other", "{nope");
        assert_eq!(p.state(), PagerState::Empty);
        assert_eq!(p.current_warning(), None);
    }

    #[test]
    fn payload_constructor_parses_json_array() {
        let p = WarningPager::from_payload("t", r#"["Warning A", "Warning B"]"#);
        assert_eq!(p.len(), 2);
        assert_eq!(p.current_warning(), Some("Warning A"));
    }

    #[test]
    fn pulse_stays_in_bounds_and_reaches_both_ends() {
        let p = pager(1);
        let origin = p.pulse_origin;
        let mut min = f32::MAX;
        let mut max = f32::MIN;
        for ms in (0..2400).step_by(50) {
            let opacity = p.pulse_opacity(origin + Duration::from_millis(ms));
            assert!((0.3..=1.0).contains(&opacity), "opacity {opacity} at {ms}ms");
            min = min.min(opacity);
            max = max.max(opacity);
        }
        assert!(min <= 0.35, "pulse never came near the floor (min {min})");
        assert!(max >= 0.95, "pulse never came near full opacity (max {max})");

        // Mid-fade at 600ms, fully faded out exactly once per cycle.
        assert_eq!(p.pulse_opacity(origin + Duration::from_millis(600)), 0.3);
        assert_eq!(p.pulse_opacity(origin), 1.0);
    }
}
