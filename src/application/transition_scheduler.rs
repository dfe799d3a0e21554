use crate::domain::models::{Settings, TransitionSpeed, TransitionStyle};
use crate::domain::overflow::OverflowState;
use crate::domain::transition::{
    enter_duration, exit_duration, page_dwell, select_variant, GentleScroll, PagedCycle,
    RenderPlan, StepAction, SteppedScroll, TransitionVariant, FRAME_INTERVAL, STEP_INTERVAL,
    STEP_RESET_PAUSE,
};
use crate::infrastructure::scroll_surface::ScrollSurface;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, interval_at, sleep, Instant, MissedTickBehavior};

#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerInput {
    pub style: TransitionStyle,
    pub speed: TransitionSpeed,
    pub custom_transition_seconds: f64,
    pub smooth_scroll: bool,
    pub overflow: OverflowState,
    pub item_count: usize,
    pub item_height: f64,
}

impl SchedulerInput {
    pub fn from_settings(
        settings: &Settings,
        overflow: OverflowState,
        item_count: usize,
        item_height: f64,
    ) -> Self {
        Self {
            style: settings.transition_style,
            speed: settings.transition_speed,
            custom_transition_seconds: settings.custom_transition_seconds,
            smooth_scroll: settings.smooth_scroll_enabled,
            overflow,
            item_count,
            item_height,
        }
    }

    fn page_plan(&self, cycle: &PagedCycle) -> RenderPlan {
        RenderPlan::Page {
            style: self.style,
            index: cycle.current_page,
            total: cycle.total_pages,
            range: cycle.page_range(self.overflow.items_per_page, self.item_count),
            enter: enter_duration(self.speed, self.custom_transition_seconds),
            exit: exit_duration(self.speed, self.custom_transition_seconds),
        }
    }
}

#[derive(Debug)]
struct SchedulerState {
    generation: u64,
    plan: RenderPlan,
    paged: PagedCycle,
}

/// Drives one list container through exactly one transition variant at a time.
///
/// Every callback captures the generation it was started under and returns
/// without touching state once a newer configuration has been applied.
pub struct TransitionScheduler {
    surface: Arc<dyn ScrollSurface>,
    state: Arc<Mutex<SchedulerState>>,
    tasks: Vec<JoinHandle<()>>,
    input: Option<SchedulerInput>,
    variant: TransitionVariant,
}

impl TransitionScheduler {
    pub fn new(surface: Arc<dyn ScrollSurface>) -> Self {
        Self {
            surface,
            state: Arc::new(Mutex::new(SchedulerState {
                generation: 0,
                plan: RenderPlan::Placeholder,
                paged: PagedCycle::default(),
            })),
            tasks: Vec::new(),
            input: None,
            variant: TransitionVariant::Static,
        }
    }

    pub fn active_variant(&self) -> TransitionVariant {
        self.variant
    }

    pub fn render_plan(&self) -> RenderPlan {
        self.state
            .lock()
            .map(|state| state.plan.clone())
            .unwrap_or(RenderPlan::Placeholder)
    }

    pub fn current_page(&self) -> usize {
        self.state
            .lock()
            .map(|state| state.paged.current_page)
            .unwrap_or(0)
    }

    /// Live timer / frame tasks owned by this scheduler.
    pub fn timer_count(&self) -> usize {
        self.tasks.iter().filter(|task| !task.is_finished()).count()
    }

    /// Cancels every running task and invalidates their pending callbacks.
    pub fn teardown(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
        if let Ok(mut state) = self.state.lock() {
            state.generation = state.generation.wrapping_add(1);
        }
    }

    pub fn configure(&mut self, input: SchedulerInput) {
        if self.input.as_ref() == Some(&input) {
            return;
        }

        self.teardown();

        let reset_page = self.input.as_ref().is_none_or(|previous| {
            previous.style != input.style || previous.item_count != input.item_count
        });
        let variant = select_variant(input.style, &input.overflow, input.item_count);
        let total_pages = input.overflow.total_pages(input.item_count);
        let entering_scroll = variant != self.variant
            && matches!(
                variant,
                TransitionVariant::SteppedScroll | TransitionVariant::ContinuousScroll
            );

        let generation = {
            let Ok(mut state) = self.state.lock() else {
                return;
            };
            if reset_page || state.paged.total_pages != total_pages {
                state.paged = PagedCycle::new(total_pages);
            }
            state.plan = if input.item_count == 0 {
                RenderPlan::Placeholder
            } else {
                match variant {
                    TransitionVariant::Static => RenderPlan::All,
                    TransitionVariant::Paged => input.page_plan(&state.paged),
                    TransitionVariant::SteppedScroll => RenderPlan::Stepped {
                        offset: 0.0,
                        smooth: input.smooth_scroll,
                    },
                    TransitionVariant::ContinuousScroll => RenderPlan::Continuous { offset: 0.0 },
                }
            };
            state.generation
        };

        if entering_scroll {
            self.surface.scroll_to(0.0, false);
        }

        tracing::debug!(
            variant = variant.as_str(),
            items = input.item_count,
            pages = total_pages,
            "transition variant selected"
        );

        if input.item_count > 0 {
            match variant {
                TransitionVariant::Static => {}
                TransitionVariant::Paged => self.tasks.push(self.spawn_paged(generation, &input)),
                TransitionVariant::SteppedScroll => {
                    self.tasks.push(self.spawn_stepped(generation, &input))
                }
                TransitionVariant::ContinuousScroll => {
                    self.tasks.push(self.spawn_continuous(generation, &input))
                }
            }
        }

        self.variant = variant;
        self.input = Some(input);
    }

    fn spawn_paged(&self, generation: u64, input: &SchedulerInput) -> JoinHandle<()> {
        let state = Arc::clone(&self.state);
        let input = input.clone();
        let dwell = page_dwell(input.speed);
        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + dwell, dwell);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Ok(mut state) = state.lock() else {
                    return;
                };
                if state.generation != generation {
                    return;
                }
                state.paged.advance();
                state.plan = input.page_plan(&state.paged);
            }
        })
    }

    fn spawn_stepped(&self, generation: u64, input: &SchedulerInput) -> JoinHandle<()> {
        let state = Arc::clone(&self.state);
        let surface = Arc::clone(&self.surface);
        let smooth = input.smooth_scroll;
        let mut stepped = SteppedScroll::new(input.item_height);
        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + STEP_INTERVAL, STEP_INTERVAL);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let action = stepped.next_action(
                    surface.scroll_top(),
                    surface.scroll_height(),
                    surface.client_height(),
                );
                let offset = match action {
                    StepAction::Wait => continue,
                    StepAction::ScrollTo(offset) | StepAction::ScrollToThenReset(offset) => offset,
                };
                if !apply_offset(&state, generation, surface.as_ref(), offset, smooth) {
                    return;
                }

                if matches!(action, StepAction::ScrollToThenReset(_)) {
                    sleep(STEP_RESET_PAUSE).await;
                    let offset = stepped.complete_reset();
                    if !apply_offset(&state, generation, surface.as_ref(), offset, smooth) {
                        return;
                    }
                }
            }
        })
    }

    fn spawn_continuous(&self, generation: u64, input: &SchedulerInput) -> JoinHandle<()> {
        let state = Arc::clone(&self.state);
        let surface = Arc::clone(&self.surface);
        let estimate = input.item_count as f64 * input.item_height;
        let mut gentle = GentleScroll::new(estimate, input.speed);
        tokio::spawn(async move {
            let mut ticker = interval(FRAME_INTERVAL);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut last_frame = Instant::now();
            loop {
                ticker.tick().await;
                // The duplicated list may not be laid out yet when the variant
                // starts, so the copy height is re-measured on every frame.
                let single_set_height = copy_height(surface.as_ref(), estimate);
                if single_set_height != gentle.single_set_height {
                    gentle.resize(single_set_height);
                }
                let now = Instant::now();
                let offset = gentle.advance(now.duration_since(last_frame));
                last_frame = now;

                let Ok(mut state) = state.lock() else {
                    return;
                };
                if state.generation != generation {
                    return;
                }
                surface.scroll_to(offset, false);
                state.plan = RenderPlan::Continuous { offset };
            }
        })
    }
}

/// One copy of a list rendered twice is half the measured scroll height.
fn copy_height(surface: &dyn ScrollSurface, estimate: f64) -> f64 {
    let measured = surface.scroll_height() / 2.0;
    if measured.is_finite() && measured > 0.0 {
        measured
    } else {
        estimate
    }
}

fn apply_offset(
    state: &Mutex<SchedulerState>,
    generation: u64,
    surface: &dyn ScrollSurface,
    offset: f64,
    smooth: bool,
) -> bool {
    let Ok(mut state) = state.lock() else {
        return false;
    };
    if state.generation != generation {
        return false;
    }
    surface.scroll_to(offset, smooth);
    state.plan = RenderPlan::Stepped { offset, smooth };
    true
}

impl Drop for TransitionScheduler {
    fn drop(&mut self) {
        self.teardown();
    }
}
