use crate::detection::domain::face::Face;
use crate::shared::frame::Frame;

/// Everything the detector reported for one processed frame.
///
/// Faces, frame and timestamp always travel together so a consumer never
/// pairs a face list with the wrong frame.
#[derive(Clone, Debug)]
pub struct ImageResults {
    pub faces: Vec<Face>,
    pub frame: Frame,
    pub timestamp: f64,
}

impl ImageResults {
    pub fn new(faces: Vec<Face>, frame: Frame, timestamp: f64) -> Self {
        Self {
            faces,
            frame,
            timestamp,
        }
    }

    pub fn has_face(&self) -> bool {
        !self.faces.is_empty()
    }

    pub fn primary_face(&self) -> Option<&Face> {
        self.faces.first()
    }
}
