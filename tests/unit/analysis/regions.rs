//! Tests for named-region classification and per-region tints

#[cfg(test)]
mod tests {
    use tilemosaic::analysis::regions::{NamedRegion, RegionPalette};

    // Tests the default palette tints pink, black and yellow but not white
    // Verified by giving white a tint
    #[test]
    fn test_default_palette() {
        let palette = RegionPalette::default();
        assert_eq!(palette.regions().len(), 4);
        assert!((palette.tolerance() - 80.0).abs() < f64::EPSILON);

        assert_eq!(palette.tint_for([240, 110, 180]), Some([244, 114, 182]));
        assert_eq!(palette.tint_for([10, 10, 10]), Some([0, 0, 0]));
        assert_eq!(palette.tint_for([250, 250, 20]), Some([255, 255, 0]));
        assert_eq!(palette.tint_for([250, 250, 250]), None);
        assert_eq!(
            palette.classify([250, 250, 250]).map(|r| r.name.as_str()),
            Some("white")
        );
    }

    // Tests colours outside the tolerance are unclassified
    // Verified by using an inclusive tolerance
    #[test]
    fn test_unclassified_outside_tolerance() {
        let palette = RegionPalette::default();
        assert!(palette.classify([0, 128, 255]).is_none());
        assert_eq!(palette.tint_for([0, 128, 255]), None);

        let exact = RegionPalette::new(vec![NamedRegion::new("grey", [100, 100, 100], None)], 10.0);
        assert!(exact.classify([110, 100, 100]).is_none());
        assert!(exact.classify([109, 100, 100]).is_some());
    }

    // Tests the nearest region wins and ties go to the first listed
    // Verified by taking the last match instead of the nearest
    #[test]
    fn test_nearest_region_wins() {
        let palette = RegionPalette::new(
            vec![
                NamedRegion::new("a", [100, 0, 0], Some([1, 1, 1])),
                NamedRegion::new("b", [140, 0, 0], Some([2, 2, 2])),
                NamedRegion::new("c", [180, 0, 0], Some([3, 3, 3])),
            ],
            100.0,
        );
        assert_eq!(palette.tint_for([135, 0, 0]), Some([2, 2, 2]));
        assert_eq!(palette.tint_for([120, 0, 0]), Some([1, 1, 1]));
        assert_eq!(palette.tint_for([175, 0, 0]), Some([3, 3, 3]));
    }

    // Tests regions deserialize with an optional tint
    // Verified by making the tint field required
    #[test]
    fn test_region_deserialize() {
        let regions: Vec<NamedRegion> = serde_json::from_str(
            r#"[{"name": "pink", "color": [244, 114, 182], "tint": [200, 0, 100]},
                {"name": "white", "color": [255, 255, 255]}]"#,
        )
        .unwrap();
        assert_eq!(regions[0].tint, Some([200, 0, 100]));
        assert_eq!(regions[1].tint, None);
    }
}
