use crate::domain::models::{TransitionSpeed, TransitionStyle};
use crate::domain::overflow::OverflowState;
use std::ops::Range;
use std::time::Duration;

pub const STEP_INTERVAL: Duration = Duration::from_millis(2000);
pub const STEP_RESET_PAUSE: Duration = Duration::from_millis(1000);
pub const STEP_ITEMS: f64 = 2.0;
pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// How long a page stays on screen. Custom speed ignores the configured seconds.
pub fn page_dwell(speed: TransitionSpeed) -> Duration {
    match speed {
        TransitionSpeed::VerySlow => Duration::from_millis(8000),
        TransitionSpeed::Slow => Duration::from_millis(5000),
        TransitionSpeed::Normal => Duration::from_millis(3000),
        TransitionSpeed::Fast => Duration::from_millis(1500),
        TransitionSpeed::Custom => Duration::from_millis(3000),
    }
}

/// Enter animation length. Custom speed honors the configured seconds.
pub fn enter_duration(speed: TransitionSpeed, custom_seconds: f64) -> Duration {
    match speed {
        TransitionSpeed::VerySlow => Duration::from_millis(1500),
        TransitionSpeed::Slow => Duration::from_millis(1000),
        TransitionSpeed::Normal => Duration::from_millis(500),
        TransitionSpeed::Fast => Duration::from_millis(250),
        TransitionSpeed::Custom => Duration::try_from_secs_f64(custom_seconds)
            .ok()
            .filter(|duration| !duration.is_zero())
            .unwrap_or(Duration::from_millis(500)),
    }
}

pub fn exit_duration(speed: TransitionSpeed, custom_seconds: f64) -> Duration {
    enter_duration(speed, custom_seconds) / 2
}

pub fn gentle_speed_px_per_second(speed: TransitionSpeed) -> f64 {
    match speed {
        TransitionSpeed::VerySlow => 15.0,
        TransitionSpeed::Slow => 25.0,
        TransitionSpeed::Normal => 40.0,
        TransitionSpeed::Fast => 60.0,
        TransitionSpeed::Custom => 40.0,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransitionVariant {
    Static,
    Paged,
    SteppedScroll,
    ContinuousScroll,
}

impl TransitionVariant {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::Paged => "paged",
            Self::SteppedScroll => "stepped_scroll",
            Self::ContinuousScroll => "continuous_scroll",
        }
    }
}

pub fn select_variant(
    style: TransitionStyle,
    overflow: &OverflowState,
    item_count: usize,
) -> TransitionVariant {
    if item_count == 0 || !overflow.has_overflow {
        return TransitionVariant::Static;
    }
    match style {
        TransitionStyle::Static => TransitionVariant::Static,
        TransitionStyle::Fade | TransitionStyle::SlideUp | TransitionStyle::SlideLeft => {
            if overflow.total_pages(item_count) > 1 {
                TransitionVariant::Paged
            } else {
                TransitionVariant::Static
            }
        }
        TransitionStyle::VerticalAutoScroll => TransitionVariant::SteppedScroll,
        TransitionStyle::GentleContinuousScroll => TransitionVariant::ContinuousScroll,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PagedCycle {
    pub current_page: usize,
    pub total_pages: usize,
}

impl PagedCycle {
    pub fn new(total_pages: usize) -> Self {
        Self {
            current_page: 0,
            total_pages,
        }
    }

    pub fn advance(&mut self) -> usize {
        self.current_page = if self.total_pages == 0 {
            0
        } else {
            (self.current_page + 1) % self.total_pages
        };
        self.current_page
    }

    pub fn page_range(&self, items_per_page: usize, item_count: usize) -> Range<usize> {
        let per_page = items_per_page.max(1);
        let start = (self.current_page * per_page).min(item_count);
        let end = (start + per_page).min(item_count);
        start..end
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepAction {
    ScrollTo(f64),
    /// Reached the end: show the bottom, then reset to the top after the pause.
    ScrollToThenReset(f64),
    /// A reset is already pending; skip this tick.
    Wait,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SteppedScroll {
    pub step: f64,
    pub reset_pending: bool,
}

impl SteppedScroll {
    pub fn new(item_height: f64) -> Self {
        Self {
            step: STEP_ITEMS * item_height,
            reset_pending: false,
        }
    }

    pub fn next_action(&mut self, current_offset: f64, scroll_height: f64, client_height: f64) -> StepAction {
        if self.reset_pending {
            return StepAction::Wait;
        }
        let max_offset = (scroll_height - client_height).max(0.0);
        let next = current_offset + self.step;
        if next >= max_offset {
            self.reset_pending = true;
            StepAction::ScrollToThenReset(max_offset)
        } else {
            StepAction::ScrollTo(next)
        }
    }

    pub fn complete_reset(&mut self) -> f64 {
        self.reset_pending = false;
        0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GentleScroll {
    pub offset: f64,
    pub single_set_height: f64,
    pub px_per_second: f64,
}

impl GentleScroll {
    pub fn new(single_set_height: f64, speed: TransitionSpeed) -> Self {
        Self {
            offset: 0.0,
            single_set_height,
            px_per_second: gentle_speed_px_per_second(speed),
        }
    }

    /// Adopts a new copy height, keeping the offset inside one copy.
    pub fn resize(&mut self, single_set_height: f64) {
        self.single_set_height = single_set_height;
        if single_set_height.is_nan() || single_set_height <= 0.0 {
            self.offset = 0.0;
        } else {
            self.offset %= single_set_height;
        }
    }

    /// Advances by `px_per_second * elapsed_ms / 1000`, wrapping by exactly one copy height.
    pub fn advance(&mut self, elapsed: Duration) -> f64 {
        if self.single_set_height.is_nan() || self.single_set_height <= 0.0 {
            self.offset = 0.0;
            return self.offset;
        }
        let elapsed_ms = elapsed.as_micros() as f64 / 1000.0;
        self.offset += self.px_per_second * elapsed_ms / 1000.0;
        while self.offset >= self.single_set_height {
            self.offset -= self.single_set_height;
        }
        self.offset
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderPlan {
    Placeholder,
    All,
    Page {
        style: TransitionStyle,
        index: usize,
        total: usize,
        range: Range<usize>,
        enter: Duration,
        exit: Duration,
    },
    Stepped {
        offset: f64,
        smooth: bool,
    },
    Continuous {
        offset: f64,
    },
}

impl RenderPlan {
    /// Key that forces an enter/exit animation when it changes. Continuous
    /// scrolling has none so the duplicated list is never remounted.
    pub fn animation_key(&self) -> Option<String> {
        match self {
            Self::Page { index, .. } => Some(format!("page-{index}")),
            _ => None,
        }
    }
}

pub fn visible_items<'a, T>(items: &'a [T], plan: &RenderPlan) -> Vec<&'a T> {
    match plan {
        RenderPlan::Placeholder => Vec::new(),
        RenderPlan::All | RenderPlan::Stepped { .. } => items.iter().collect(),
        RenderPlan::Page { range, .. } => {
            let end = range.end.min(items.len());
            let start = range.start.min(end);
            items[start..end].iter().collect()
        }
        RenderPlan::Continuous { .. } => items.iter().chain(items.iter()).collect(),
    }
}
