use std::sync::Mutex;

/// A scrollable container the transition scheduler drives.
pub trait ScrollSurface: Send + Sync {
    fn scroll_to(&self, offset: f64, smooth: bool);
    fn scroll_top(&self) -> f64;
    fn scroll_height(&self) -> f64;
    fn client_height(&self) -> f64;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollCall {
    pub offset: f64,
    pub smooth: bool,
}

#[derive(Debug, Default)]
struct SurfaceState {
    scroll_top: f64,
    scroll_height: f64,
    client_height: f64,
    calls: Vec<ScrollCall>,
}

/// Headless surface: offsets are clamped like a browser scroll container.
#[derive(Debug, Default)]
pub struct InMemoryScrollSurface {
    state: Mutex<SurfaceState>,
}

impl InMemoryScrollSurface {
    pub fn new(scroll_height: f64, client_height: f64) -> Self {
        Self {
            state: Mutex::new(SurfaceState {
                scroll_height,
                client_height,
                ..SurfaceState::default()
            }),
        }
    }

    pub fn set_heights(&self, scroll_height: f64, client_height: f64) {
        if let Ok(mut state) = self.state.lock() {
            state.scroll_height = scroll_height;
            state.client_height = client_height;
        }
    }

    pub fn calls(&self) -> Vec<ScrollCall> {
        self.state
            .lock()
            .map(|state| state.calls.clone())
            .unwrap_or_default()
    }
}

impl ScrollSurface for InMemoryScrollSurface {
    fn scroll_to(&self, offset: f64, smooth: bool) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        let max = (state.scroll_height - state.client_height).max(0.0);
        state.scroll_top = offset.clamp(0.0, max);
        state.calls.push(ScrollCall { offset, smooth });
    }

    fn scroll_top(&self) -> f64 {
        self.state.lock().map(|state| state.scroll_top).unwrap_or(0.0)
    }

    fn scroll_height(&self) -> f64 {
        self.state
            .lock()
            .map(|state| state.scroll_height)
            .unwrap_or(0.0)
    }

    fn client_height(&self) -> f64 {
        self.state
            .lock()
            .map(|state| state.client_height)
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scroll_offset_is_clamped_to_scrollable_range() {
        let surface = InMemoryScrollSurface::new(500.0, 200.0);
        surface.scroll_to(450.0, true);
        assert_eq!(surface.scroll_top(), 300.0);
        surface.scroll_to(-10.0, false);
        assert_eq!(surface.scroll_top(), 0.0);
        assert_eq!(
            surface.calls(),
            vec![
                ScrollCall {
                    offset: 450.0,
                    smooth: true
                },
                ScrollCall {
                    offset: -10.0,
                    smooth: false
                },
            ]
        );
    }
}
