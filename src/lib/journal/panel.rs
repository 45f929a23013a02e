//! Width model of the slide-in sheet panel and its drag-to-resize gesture.
use std::{
    collections::BTreeSet,
    sync::{Mutex, PoisonError},
};

use log::trace;

use super::models::Config;

/// Viewport edge the panel is pinned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Edge {
    Left,
    #[default]
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PointerEvent {
    Move,
    Up,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ListenerHandle {
    id: u64,
    event: PointerEvent,
}

/// Listeners attached to the whole document rather than to the panel.
#[derive(Debug, Default)]
pub struct ListenerRegistry {
    inner: Mutex<(u64, BTreeSet<ListenerHandle>)>,
}

impl ListenerRegistry {
    pub fn register(&self, event: PointerEvent) -> ListenerHandle {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.0 += 1;
        let handle = ListenerHandle { id: inner.0, event };
        inner.1.insert(handle);
        trace!("Registered {:?} listener {}", event, handle.id);
        handle
    }

    pub fn unregister(&self, handle: ListenerHandle) -> bool {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        trace!("Unregistered {:?} listener {}", handle.event, handle.id);
        inner.1.remove(&handle)
    }

    pub fn active(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .1
            .len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResizablePanel {
    width: f64,
    min_width: f64,
    max_width: f64,
    edge: Edge,
}

impl ResizablePanel {
    pub fn new(width: f64, min_width: f64, max_width: f64, edge: Edge) -> Self {
        let (min_width, max_width) = if min_width <= max_width {
            (min_width, max_width)
        } else {
            (max_width, min_width)
        };
        ResizablePanel {
            width: width.clamp(min_width, max_width),
            min_width,
            max_width,
            edge,
        }
    }

    /// Right-pinned panel starting at its minimum width.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.panel_min_width,
            config.panel_min_width,
            config.panel_max_width,
            Edge::Right,
        )
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn set_width(&mut self, width: f64) -> f64 {
        self.width = width.clamp(self.min_width, self.max_width);
        self.width
    }

    /// Starts a resize at pointer position `x`. The document listeners live
    /// exactly as long as the returned gesture.
    pub fn begin_drag<'a>(&'a mut self, registry: &'a ListenerRegistry, x: f64) -> DragGesture<'a> {
        let listeners = [
            registry.register(PointerEvent::Move),
            registry.register(PointerEvent::Up),
        ];
        DragGesture {
            start_x: x,
            start_width: self.width,
            panel: self,
            registry,
            listeners,
        }
    }
}

pub struct DragGesture<'a> {
    panel: &'a mut ResizablePanel,
    registry: &'a ListenerRegistry,
    listeners: [ListenerHandle; 2],
    start_x: f64,
    start_width: f64,
}

impl DragGesture<'_> {
    pub fn pointer_move(&mut self, x: f64) -> f64 {
        let delta = match self.panel.edge {
            Edge::Right => self.start_x - x,
            Edge::Left => x - self.start_x,
        };
        self.panel.set_width(self.start_width + delta)
    }

    /// Pointer released: final move, then the listeners go away.
    pub fn pointer_up(mut self, x: f64) -> f64 {
        self.pointer_move(x)
    }
}

impl Drop for DragGesture<'_> {
    fn drop(&mut self) {
        for handle in self.listeners {
            self.registry.unregister(handle);
        }
    }
}
