//! OpenCV ArUco marker detection (`camera` feature).

use aruco_space::{MarkerDetection, PixelPoint};
use opencv::core::{Point2f, Vector};
use opencv::objdetect::{self, ArucoDetector, DetectorParameters, PredefinedDictionaryType, RefineParameters};
use opencv::prelude::*;
use tracing::{debug, info};

use crate::camera::frame_to_mat;
use crate::config::MarkerDictionary;
use crate::frame::Frame;
use crate::provider::{MarkerFeatureProvider, ProviderError};

fn predefined(dictionary: MarkerDictionary) -> PredefinedDictionaryType {
    use MarkerDictionary::*;
    match dictionary {
        Dict4x4_50    => PredefinedDictionaryType::DICT_4X4_50,
        Dict4x4_100   => PredefinedDictionaryType::DICT_4X4_100,
        Dict4x4_250   => PredefinedDictionaryType::DICT_4X4_250,
        Dict4x4_1000  => PredefinedDictionaryType::DICT_4X4_1000,
        Dict5x5_50    => PredefinedDictionaryType::DICT_5X5_50,
        Dict5x5_100   => PredefinedDictionaryType::DICT_5X5_100,
        Dict5x5_250   => PredefinedDictionaryType::DICT_5X5_250,
        Dict5x5_1000  => PredefinedDictionaryType::DICT_5X5_1000,
        Dict6x6_50    => PredefinedDictionaryType::DICT_6X6_50,
        Dict6x6_100   => PredefinedDictionaryType::DICT_6X6_100,
        Dict6x6_250   => PredefinedDictionaryType::DICT_6X6_250,
        Dict6x6_1000  => PredefinedDictionaryType::DICT_6X6_1000,
        Dict7x7_50    => PredefinedDictionaryType::DICT_7X7_50,
        Dict7x7_100   => PredefinedDictionaryType::DICT_7X7_100,
        Dict7x7_250   => PredefinedDictionaryType::DICT_7X7_250,
        Dict7x7_1000  => PredefinedDictionaryType::DICT_7X7_1000,
        ArucoOriginal => PredefinedDictionaryType::DICT_ARUCO_ORIGINAL,
    }
}

/// `ArucoDetector` with default detection parameters and one dictionary.
pub struct ArucoMarkerProvider {
    detector:   ArucoDetector,
    corners:    Vector<Vector<Point2f>>,
    ids:        Vector<i32>,
    rejected:   Vector<Vector<Point2f>>,
}

impl ArucoMarkerProvider {
    pub fn new(dictionary: MarkerDictionary) -> Result<Self, ProviderError> {
        let setup = |e: opencv::Error| ProviderError::Setup(format!("ArUco {}: {}", dictionary, e));

        let dict     = objdetect::get_predefined_dictionary(predefined(dictionary)).map_err(setup)?;
        let params   = DetectorParameters::default().map_err(setup)?;
        let refine   = RefineParameters::new_def().map_err(setup)?;
        let detector = ArucoDetector::new(&dict, &params, refine).map_err(setup)?;

        info!(%dictionary, "ArUco detector ready");
        Ok(ArucoMarkerProvider {
            detector,
            corners:  Vector::new(),
            ids:      Vector::new(),
            rejected: Vector::new(),
        })
    }
}

impl MarkerFeatureProvider for ArucoMarkerProvider {
    fn detect_markers(&mut self, frame: &Frame) -> Result<Vec<MarkerDetection>, ProviderError> {
        let detection = |e: opencv::Error| ProviderError::Detection(e.to_string());

        let image = frame_to_mat(frame).map_err(detection)?;
        self.corners.clear();
        self.ids.clear();
        self.rejected.clear();
        self.detector
            .detect_markers(&image, &mut self.corners, &mut self.ids, &mut self.rejected)
            .map_err(detection)?;

        let mut out = Vec::with_capacity(self.ids.len());
        for (id, quad) in self.ids.iter().zip(self.corners.iter()) {
            let Ok(marker_id) = u32::try_from(id) else {
                debug!(id, "ignoring negative marker id");
                continue;
            };
            if quad.len() != 4 {
                debug!(marker_id, corners = quad.len(), "ignoring marker without four corners");
                continue;
            }
            let mut corners = [PixelPoint::default(); 4];
            for (slot, p) in corners.iter_mut().zip(quad.iter()) {
                *slot = PixelPoint::new(p.x, p.y);
            }
            out.push(MarkerDetection::new(marker_id, corners));
        }
        Ok(out)
    }
}
