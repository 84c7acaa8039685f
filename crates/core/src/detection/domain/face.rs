use crate::detection::domain::metric::Metric;

/// Emotion scores, 0–100 except valence which is -100–100.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Emotions {
    pub anger: f32,
    pub contempt: f32,
    pub disgust: f32,
    pub engagement: f32,
    pub fear: f32,
    pub joy: f32,
    pub sadness: f32,
    pub surprise: f32,
    pub valence: f32,
}

/// Facial action scores, 0–100.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Expressions {
    pub attention: f32,
    pub brow_furrow: f32,
    pub brow_raise: f32,
    pub chin_raise: f32,
    pub eye_closure: f32,
    pub inner_brow_raise: f32,
    pub lip_corner_depressor: f32,
    pub lip_press: f32,
    pub lip_pucker: f32,
    pub lip_suck: f32,
    pub mouth_open: f32,
    pub nose_wrinkle: f32,
    pub smile: f32,
    pub smirk: f32,
    pub upper_lip_raise: f32,
}

/// Head pose in degrees.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Orientation {
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Measurements {
    pub orientation: Orientation,
    pub interocular_distance: f32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FacePoint {
    pub x: f32,
    pub y: f32,
}

/// One face reported by the detector for a single frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Face {
    pub id: u32,
    pub emotions: Emotions,
    pub expressions: Expressions,
    pub measurements: Measurements,
    /// Landmarks in the detector's (rotated) frame coordinates.
    pub points: Vec<FacePoint>,
}

impl Face {
    pub fn score(&self, metric: Metric) -> f32 {
        let e = &self.emotions;
        let x = &self.expressions;
        let m = &self.measurements;
        match metric {
            Metric::Anger => e.anger,
            Metric::Contempt => e.contempt,
            Metric::Disgust => e.disgust,
            Metric::Engagement => e.engagement,
            Metric::Fear => e.fear,
            Metric::Joy => e.joy,
            Metric::Sadness => e.sadness,
            Metric::Surprise => e.surprise,
            Metric::Valence => e.valence,
            Metric::Attention => x.attention,
            Metric::BrowFurrow => x.brow_furrow,
            Metric::BrowRaise => x.brow_raise,
            Metric::ChinRaiser => x.chin_raise,
            Metric::EyeClosure => x.eye_closure,
            Metric::InnerBrowRaiser => x.inner_brow_raise,
            Metric::LipDepressor => x.lip_corner_depressor,
            Metric::LipPress => x.lip_press,
            Metric::LipPucker => x.lip_pucker,
            Metric::LipSuck => x.lip_suck,
            Metric::MouthOpen => x.mouth_open,
            Metric::NoseWrinkler => x.nose_wrinkle,
            Metric::Smile => x.smile,
            Metric::Smirk => x.smirk,
            Metric::UpperLipRaiser => x.upper_lip_raise,
            Metric::Yaw => m.orientation.yaw,
            Metric::Pitch => m.orientation.pitch,
            Metric::Roll => m.orientation.roll,
            Metric::InterOcularDistance => m.interocular_distance,
        }
    }

    /// Highest-scoring emotion, ignoring valence (which is signed).
    pub fn dominant_emotion(&self) -> Option<(Metric, f32)> {
        Metric::emotions()
            .iter()
            .filter(|m| **m != Metric::Valence)
            .map(|&m| (m, self.score(m)))
            .filter(|(_, s)| s.is_finite())
            .max_by(|a, b| a.1.total_cmp(&b.1))
    }
}
