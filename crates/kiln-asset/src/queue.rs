//! Pending model-load requests handed from UI callbacks to the editor loop

use std::sync::mpsc::{self, Receiver, Sender};

/// Cloneable sender side. File dialogs, drag-and-drop handlers and other
/// threads use it to request a load without touching the scene.
#[derive(Debug, Clone)]
pub struct LoadRequester {
    tx: Sender<String>,
}

impl LoadRequester {
    /// Queue a path; returns false once the queue has been dropped
    pub fn request(&self, path: impl Into<String>) -> bool {
        let path = path.into();
        if path.trim().is_empty() {
            return false;
        }
        self.tx.send(path).is_ok()
    }
}

/// Receiving side, drained once per frame by the editor loop
#[derive(Debug)]
pub struct LoadQueue {
    tx: Sender<String>,
    rx: Receiver<String>,
}

impl Default for LoadQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self { tx, rx }
    }

    pub fn requester(&self) -> LoadRequester {
        LoadRequester {
            tx: self.tx.clone(),
        }
    }

    /// Queue a path from the editor thread itself
    pub fn push(&self, path: impl Into<String>) -> bool {
        self.requester().request(path)
    }

    /// Take every pending path in submission order, dropping duplicates
    pub fn drain(&self) -> Vec<String> {
        let mut paths: Vec<String> = Vec::new();
        while let Ok(path) = self.rx.try_recv() {
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
        paths
    }
}
