use thiserror::Error;

use crate::panorama::PanoramaId;

/// Errors returned by [`Tour`](crate::Tour) operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TourError {
    /// The handle never existed or its panorama was disposed.
    #[error("{0} is not part of this tour")]
    UnknownPanorama(PanoramaId),

    #[error("{panorama} has no hotspot at index {index}")]
    UnknownHotspot { panorama: PanoramaId, index: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_panorama() {
        let err = TourError::UnknownHotspot {
            panorama: PanoramaId(2),
            index: 5,
        };
        assert_eq!(err.to_string(), "panorama#2 has no hotspot at index 5");
        assert_eq!(
            TourError::UnknownPanorama(PanoramaId(9)).to_string(),
            "panorama#9 is not part of this tour"
        );
    }
}
