//! Drag-and-drop and file picker adapter.

use crate::file::CandidateFile;

/// Raw input coming from the drop zone or the native file chooser.
#[derive(Debug, Clone)]
pub enum InputEvent {
    /// Pointer carrying files entered the drop zone.
    DragEnter,
    /// Pointer carrying files moved over the drop zone.
    DragOver,
    /// Pointer left the drop zone without dropping.
    DragLeave,
    /// Files were dropped. Only the first one is used.
    Drop(Vec<CandidateFile>),
    /// A file was chosen in the file picker.
    Picked(CandidateFile),
}

/// Tracks the "drag active" highlight and turns input events into selections.
#[derive(Debug, Default, Clone, Copy)]
pub struct DropZone {
    active: bool,
}

impl DropZone {
    /// Whether a drag is currently hovering the zone.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Feed one event. Returns the selected file, if the event completed a selection.
    pub fn handle(&mut self, event: InputEvent) -> Option<CandidateFile> {
        match event {
            InputEvent::DragEnter | InputEvent::DragOver => {
                self.active = true;
                None
            }
            InputEvent::DragLeave => {
                self.active = false;
                None
            }
            InputEvent::Drop(files) => {
                self.active = false;
                files.into_iter().next()
            }
            InputEvent::Picked(file) => Some(file),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png(name: &str) -> CandidateFile {
        CandidateFile::new(name, "image/png", vec![1, 2, 3])
    }

    #[test]
    fn drag_state_follows_enter_and_leave() {
        let mut zone = DropZone::default();
        assert!(!zone.is_active());

        assert!(zone.handle(InputEvent::DragEnter).is_none());
        assert!(zone.is_active());
        assert!(zone.handle(InputEvent::DragOver).is_none());
        assert!(zone.is_active());
        assert!(zone.handle(InputEvent::DragLeave).is_none());
        assert!(!zone.is_active());
    }

    #[test]
    fn drop_yields_first_file_and_clears_highlight() {
        let mut zone = DropZone::default();
        zone.handle(InputEvent::DragEnter);

        let file = zone
            .handle(InputEvent::Drop(vec![png("a.png"), png("b.png")]))
            .unwrap();
        assert_eq!(file.name, "a.png");
        assert!(!zone.is_active());
    }

    #[test]
    fn empty_drop_selects_nothing() {
        let mut zone = DropZone::default();
        assert!(zone.handle(InputEvent::Drop(Vec::new())).is_none());
    }

    #[test]
    fn picker_yields_file() {
        let mut zone = DropZone::default();
        let file = zone.handle(InputEvent::Picked(png("c.png"))).unwrap();
        assert_eq!(file.name, "c.png");
    }
}
