use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Classes that score positively when clicked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    Boar,
    WildBoar,
}

/// Non-human distractors. Pig carries a lighter penalty than the rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DistractorKind {
    Pig,
    Deer,
    Dog,
    Monkey,
    Other,
}

/// Closed set of semantic detection classes.
///
/// Raw model class ids map into this through the configured class table;
/// an unmapped id is an `UnknownClass` error, never a fallthrough default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnimalClass {
    Target(TargetKind),
    Human,
    Distractor(DistractorKind),
}

impl AnimalClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnimalClass::Target(TargetKind::Boar) => "boar",
            AnimalClass::Target(TargetKind::WildBoar) => "wild-boar",
            AnimalClass::Human => "human",
            AnimalClass::Distractor(DistractorKind::Pig) => "pig",
            AnimalClass::Distractor(DistractorKind::Deer) => "deer",
            AnimalClass::Distractor(DistractorKind::Dog) => "dog",
            AnimalClass::Distractor(DistractorKind::Monkey) => "monkey",
            AnimalClass::Distractor(DistractorKind::Other) => "other",
        }
    }

    pub fn is_target(&self) -> bool {
        matches!(self, AnimalClass::Target(_))
    }
}

impl fmt::Display for AnimalClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const CLASS_NAMES: &[&str] = &[
    "boar",
    "wild-boar",
    "human",
    "pig",
    "deer",
    "dog",
    "monkey",
    "other",
];

impl Serialize for AnimalClass {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AnimalClass {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        match name.as_str() {
            "boar" => Ok(AnimalClass::Target(TargetKind::Boar)),
            "wild-boar" => Ok(AnimalClass::Target(TargetKind::WildBoar)),
            "human" => Ok(AnimalClass::Human),
            "pig" => Ok(AnimalClass::Distractor(DistractorKind::Pig)),
            "deer" => Ok(AnimalClass::Distractor(DistractorKind::Deer)),
            "dog" => Ok(AnimalClass::Distractor(DistractorKind::Dog)),
            "monkey" => Ok(AnimalClass::Distractor(DistractorKind::Monkey)),
            "other" => Ok(AnimalClass::Distractor(DistractorKind::Other)),
            unknown => Err(serde::de::Error::unknown_variant(unknown, CLASS_NAMES)),
        }
    }
}

/// Detection box, center-based, every coordinate normalized to [0, 1].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// One vertex of a segmentation contour, normalized to [0, 1].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ContourPoint {
    pub x: f64,
    pub y: f64,
}

/// One detected animal in an analyzed image. Immutable once built; owned
/// by the per-image cache until its round ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Detection {
    pub class: AnimalClass,
    pub confidence: f64,
    pub bbox: BoundingBox,
    pub is_target: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contour: Option<Vec<ContourPoint>>,
}

impl Detection {
    pub fn new(
        class: AnimalClass,
        confidence: f64,
        bbox: BoundingBox,
        contour: Option<Vec<ContourPoint>>,
    ) -> Self {
        Self {
            class,
            confidence,
            bbox,
            is_target: class.is_target(),
            contour,
        }
    }
}

/// Untranslated detector output: raw class id plus a pixel-space box.
#[derive(Debug, Clone)]
pub struct RawDetection {
    pub class_id: u32,
    pub confidence: f64,
    /// Pixel corners: x1, y1, x2, y2.
    pub bbox_pixels: [f64; 4],
    pub contour_pixels: Option<Vec<[f64; 2]>>,
}

/// Result of running one image through the detection pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageAnalysis {
    pub image_id: String,
    pub detections: Vec<Detection>,
    pub processing_time_ms: f64,
    pub has_target: bool,
    pub target_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_names_round_trip_through_serde() {
        for class in [
            AnimalClass::Target(TargetKind::WildBoar),
            AnimalClass::Human,
            AnimalClass::Distractor(DistractorKind::Pig),
        ] {
            let json = serde_json::to_string(&class).unwrap();
            let back: AnimalClass = serde_json::from_str(&json).unwrap();
            assert_eq!(back, class);
        }
    }

    #[test]
    fn unknown_class_name_fails_to_deserialize() {
        assert!(serde_json::from_str::<AnimalClass>("\"giraffe\"").is_err());
    }

    #[test]
    fn detection_derives_target_flag_from_class() {
        let bbox = BoundingBox {
            x: 0.5,
            y: 0.5,
            width: 0.2,
            height: 0.2,
        };
        assert!(Detection::new(AnimalClass::Target(TargetKind::Boar), 0.9, bbox, None).is_target);
        assert!(!Detection::new(AnimalClass::Human, 0.9, bbox, None).is_target);
    }
}
