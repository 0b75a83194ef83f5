// SPDX-License-Identifier: GPL-3.0-only

//! Camera label heuristics
//!
//! Platforms report camera metadata inconsistently, so the label is the
//! first hint for a device's facing. Facing matches are case-insensitive
//! substring matches; dual wide matches are exact.
//!
//! The tables are a curated set of English labels plus common translations
//! of "front"/"back" and of the iOS dual wide camera name. Extend them as
//! new device labels turn up.

/// Keywords found in labels of user-facing cameras
const FRONT_CAMERA_KEYWORDS: &[&str] = &[
    "front",
    "user",
    "selfie",
    "facetime",
    "frontal",
    "avant",
    "vorder",
    "delantera",
    "anteriore",
    "フロント",
    "前置",
];

/// Keywords found in labels of environment-facing cameras
const BACK_CAMERA_KEYWORDS: &[&str] = &[
    "back",
    "rear",
    "environment",
    "world",
    "trasera",
    "arrière",
    "rück",
    "posteriore",
    "traseira",
    "背面",
    "后置",
    "バック",
];

/// Localized names of the iOS virtual "Back Dual Wide Camera"
///
/// This device fuses the wide and ultra-wide sensors and is the best
/// document camera on devices that have it.
pub const BACK_DUAL_WIDE_CAMERA_LOCALIZATIONS: &[&str] = &[
    "Back Dual Wide Camera",
    "Rückseitige Dual-Weitwinkelkamera",
    "Caméra arrière double grand angle",
    "Cámara trasera dual gran angular",
    "Fotocamera posteriore doppia grandangolare",
    "Câmera Dupla Grande-Angular Traseira",
    "Achterste dubbele groothoekcamera",
    "Tylny podwójny aparat szerokokątny",
    "背面デュアル広角カメラ",
    "后置双广角摄像头",
    "後置雙廣角相機",
    "후면 듀얼 광각 카메라",
];

fn contains_keyword(label: &str, keywords: &[&str]) -> bool {
    let label = label.to_lowercase();
    keywords.iter().any(|keyword| label.contains(keyword))
}

/// Check if the label suggests a user-facing camera
pub fn is_front_camera_name(label: &str) -> bool {
    contains_keyword(label, FRONT_CAMERA_KEYWORDS)
}

/// Check if the label suggests an environment-facing camera
pub fn is_back_camera_name(label: &str) -> bool {
    contains_keyword(label, BACK_CAMERA_KEYWORDS)
}

/// Check if the label is one of the dual wide back camera names
pub fn is_back_dual_wide_camera_name(label: &str) -> bool {
    BACK_DUAL_WIDE_CAMERA_LOCALIZATIONS.contains(&label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_android_labels() {
        assert!(is_front_camera_name("camera2 1, facing front"));
        assert!(is_back_camera_name("camera2 0, facing back"));
        assert!(!is_back_camera_name("camera2 1, facing front"));
    }

    #[test]
    fn test_ios_labels() {
        assert!(is_front_camera_name("Front Camera"));
        assert!(is_back_camera_name("Back Ultra Wide Camera"));
        assert!(is_back_dual_wide_camera_name("Back Dual Wide Camera"));
        assert!(!is_back_dual_wide_camera_name("Back Camera"));
    }

    #[test]
    fn test_localized_labels() {
        assert!(is_back_camera_name("Caméra arrière"));
        assert!(is_front_camera_name("Cámara delantera"));
        assert!(is_back_dual_wide_camera_name("Rückseitige Dual-Weitwinkelkamera"));
        // Exact match only, no keyword search
        assert!(!is_back_dual_wide_camera_name("back dual wide camera"));
    }

    #[test]
    fn test_desktop_labels_have_no_hint() {
        let label = "Integrated Webcam (0bda:5510)";
        assert!(!is_front_camera_name(label));
        assert!(!is_back_camera_name(label));
    }
}
