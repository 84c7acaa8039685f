use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricCategory {
    Emotion,
    Expression,
    Measurement,
}

/// Every score a detector reports for a face.
///
/// Declaration order is significant: emotions first, then expressions, then
/// measurements. The category slices below are cut from [`Metric::ALL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Anger,
    Disgust,
    Fear,
    Joy,
    Sadness,
    Surprise,
    Contempt,
    Engagement,
    Valence,

    Attention,
    BrowFurrow,
    BrowRaise,
    ChinRaiser,
    EyeClosure,
    InnerBrowRaiser,
    LipDepressor,
    LipPress,
    LipPucker,
    LipSuck,
    MouthOpen,
    NoseWrinkler,
    Smile,
    Smirk,
    UpperLipRaiser,

    Yaw,
    Pitch,
    Roll,
    InterOcularDistance,
}

const EMOTION_COUNT: usize = 9;
const EXPRESSION_COUNT: usize = 15;

impl Metric {
    pub const ALL: [Metric; 28] = [
        Metric::Anger,
        Metric::Disgust,
        Metric::Fear,
        Metric::Joy,
        Metric::Sadness,
        Metric::Surprise,
        Metric::Contempt,
        Metric::Engagement,
        Metric::Valence,
        Metric::Attention,
        Metric::BrowFurrow,
        Metric::BrowRaise,
        Metric::ChinRaiser,
        Metric::EyeClosure,
        Metric::InnerBrowRaiser,
        Metric::LipDepressor,
        Metric::LipPress,
        Metric::LipPucker,
        Metric::LipSuck,
        Metric::MouthOpen,
        Metric::NoseWrinkler,
        Metric::Smile,
        Metric::Smirk,
        Metric::UpperLipRaiser,
        Metric::Yaw,
        Metric::Pitch,
        Metric::Roll,
        Metric::InterOcularDistance,
    ];

    pub fn emotions() -> &'static [Metric] {
        &Self::ALL[..EMOTION_COUNT]
    }

    pub fn expressions() -> &'static [Metric] {
        &Self::ALL[EMOTION_COUNT..EMOTION_COUNT + EXPRESSION_COUNT]
    }

    pub fn measurements() -> &'static [Metric] {
        &Self::ALL[EMOTION_COUNT + EXPRESSION_COUNT..]
    }

    pub fn category(self) -> MetricCategory {
        let ordinal = self as usize;
        if ordinal < EMOTION_COUNT {
            MetricCategory::Emotion
        } else if ordinal < EMOTION_COUNT + EXPRESSION_COUNT {
            MetricCategory::Expression
        } else {
            MetricCategory::Measurement
        }
    }

    /// Identifier form, e.g. `brow_furrow`.
    pub fn lower_case_name(self) -> &'static str {
        match self {
            Metric::Anger => "anger",
            Metric::Disgust => "disgust",
            Metric::Fear => "fear",
            Metric::Joy => "joy",
            Metric::Sadness => "sadness",
            Metric::Surprise => "surprise",
            Metric::Contempt => "contempt",
            Metric::Engagement => "engagement",
            Metric::Valence => "valence",
            Metric::Attention => "attention",
            Metric::BrowFurrow => "brow_furrow",
            Metric::BrowRaise => "brow_raise",
            Metric::ChinRaiser => "chin_raiser",
            Metric::EyeClosure => "eye_closure",
            Metric::InnerBrowRaiser => "inner_brow_raiser",
            Metric::LipDepressor => "lip_depressor",
            Metric::LipPress => "lip_press",
            Metric::LipPucker => "lip_pucker",
            Metric::LipSuck => "lip_suck",
            Metric::MouthOpen => "mouth_open",
            Metric::NoseWrinkler => "nose_wrinkler",
            Metric::Smile => "smile",
            Metric::Smirk => "smirk",
            Metric::UpperLipRaiser => "upper_lip_raiser",
            Metric::Yaw => "yaw",
            Metric::Pitch => "pitch",
            Metric::Roll => "roll",
            Metric::InterOcularDistance => "inter_ocular_distance",
        }
    }

    /// Display label, e.g. `BROW FURROW`.
    pub fn upper_case_name(self) -> String {
        self.lower_case_name().replace('_', " ").to_uppercase()
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.lower_case_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_category_sizes() {
        assert_eq!(Metric::emotions().len(), 9);
        assert_eq!(Metric::expressions().len(), 15);
        assert_eq!(Metric::measurements().len(), 4);
        assert_eq!(Metric::ALL.len(), 28);
    }

    #[test]
    fn test_all_is_in_declaration_order() {
        for (i, metric) in Metric::ALL.iter().enumerate() {
            assert_eq!(*metric as usize, i, "{metric} out of place");
        }
    }

    #[test]
    fn test_slices_match_categories() {
        assert!(Metric::emotions()
            .iter()
            .all(|m| m.category() == MetricCategory::Emotion));
        assert!(Metric::expressions()
            .iter()
            .all(|m| m.category() == MetricCategory::Expression));
        assert!(Metric::measurements()
            .iter()
            .all(|m| m.category() == MetricCategory::Measurement));
    }

    #[rstest]
    #[case::first_emotion(Metric::Anger, MetricCategory::Emotion)]
    #[case::last_emotion(Metric::Valence, MetricCategory::Emotion)]
    #[case::first_expression(Metric::Attention, MetricCategory::Expression)]
    #[case::last_expression(Metric::UpperLipRaiser, MetricCategory::Expression)]
    #[case::first_measurement(Metric::Yaw, MetricCategory::Measurement)]
    fn test_category_boundaries(#[case] metric: Metric, #[case] expected: MetricCategory) {
        assert_eq!(metric.category(), expected);
    }

    #[rstest]
    #[case(Metric::BrowFurrow, "brow_furrow", "BROW FURROW")]
    #[case(Metric::InterOcularDistance, "inter_ocular_distance", "INTER OCULAR DISTANCE")]
    #[case(Metric::Joy, "joy", "JOY")]
    fn test_names(#[case] metric: Metric, #[case] lower: &str, #[case] upper: &str) {
        assert_eq!(metric.lower_case_name(), lower);
        assert_eq!(metric.upper_case_name(), upper);
        assert_eq!(metric.to_string(), lower);
    }
}
