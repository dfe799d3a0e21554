//! Overflow measurement for list containers.
//!
//! A container is measured once per resize notification or item-count change.
//! The measured content height wins when the measurement node reported one;
//! otherwise the item count is multiplied by the configured average item height.

pub const DEFAULT_ITEM_HEIGHT_PX: f64 = 48.0;
pub const DEFAULT_OVERFLOW_PADDING_PX: f64 = 16.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContainerMetrics {
    /// Visible (client) height of the scroll container.
    pub visible_height: f64,
    /// Height reported by the measurement node, if it is mounted.
    pub content_height: Option<f64>,
}

impl ContainerMetrics {
    pub fn new(visible_height: f64) -> Self {
        Self {
            visible_height,
            content_height: None,
        }
    }

    pub fn with_content_height(mut self, content_height: f64) -> Self {
        self.content_height = Some(content_height);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverflowConfig {
    pub item_height: f64,
    pub padding: f64,
}

impl Default for OverflowConfig {
    fn default() -> Self {
        Self {
            item_height: DEFAULT_ITEM_HEIGHT_PX,
            padding: DEFAULT_OVERFLOW_PADDING_PX,
        }
    }
}

impl OverflowConfig {
    pub fn estimated_content_height(&self, item_count: usize) -> f64 {
        item_count as f64 * self.item_height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverflowState {
    pub has_overflow: bool,
    pub items_per_page: usize,
}

impl Default for OverflowState {
    fn default() -> Self {
        Self {
            has_overflow: false,
            items_per_page: 1,
        }
    }
}

impl OverflowState {
    pub fn total_pages(&self, item_count: usize) -> usize {
        if item_count == 0 {
            return 0;
        }
        item_count.div_ceil(self.items_per_page.max(1))
    }
}

pub fn items_per_page(visible_height: f64, item_height: f64) -> usize {
    if !visible_height.is_finite() || !item_height.is_finite() || item_height <= 0.0 {
        return 1;
    }
    let fitted = (visible_height / item_height).floor();
    if fitted < 1.0 { 1 } else { fitted as usize }
}

/// Computes the overflow state without touching the list itself.
///
/// A missing container yields the default (no overflow, one item per page).
pub fn detect_overflow(
    metrics: Option<ContainerMetrics>,
    item_count: usize,
    config: &OverflowConfig,
) -> OverflowState {
    let Some(metrics) = metrics else {
        return OverflowState::default();
    };
    let visible_height = if metrics.visible_height.is_finite() {
        metrics.visible_height.max(0.0)
    } else {
        0.0
    };

    let has_overflow = match metrics.content_height.filter(|height| height.is_finite()) {
        Some(content_height) => content_height > visible_height,
        None => config.estimated_content_height(item_count) > visible_height - config.padding,
    };

    OverflowState {
        has_overflow,
        items_per_page: items_per_page(visible_height, config.item_height),
    }
}
