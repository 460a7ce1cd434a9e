//! Tests for the assembly state machine and per-stage behaviour

#[cfg(test)]
mod tests {
    use image::{Rgb, RgbImage};
    use tilemosaic::MosaicError;
    use tilemosaic::algorithm::executor::{AssemblyConfig, AssemblyStage, MosaicAssembler};
    use tilemosaic::algorithm::pool::ReusePolicy;
    use tilemosaic::analysis::background::BackgroundSpec;
    use tilemosaic::analysis::regions::{NamedRegion, RegionPalette};
    use tilemosaic::io::error::RunWarning;
    use tilemosaic::math::blend::{BlendConfig, BlendMode};
    use tilemosaic::spatial::grid::CellFill;
    use tilemosaic::spatial::tiles::Tile;

    fn small_config() -> AssemblyConfig {
        AssemblyConfig {
            tile_size: 10,
            reuse: ReusePolicy::unconstrained(),
            ..AssemblyConfig::default()
        }
    }

    // Left half red, right half blue, 40x20 pixels
    fn split_target() -> RgbImage {
        RgbImage::from_fn(40, 20, |x, _| {
            if x < 20 {
                Rgb([250, 0, 0])
            } else {
                Rgb([0, 0, 250])
            }
        })
    }

    fn red_blue_tiles(size: u32) -> Vec<Tile> {
        vec![
            Tile::solid(size, [255, 0, 0], "red"),
            Tile::solid(size, [0, 0, 255], "blue"),
        ]
    }

    // Tests stage names used in diagnostics
    // Verified by using the variant debug names
    #[test]
    fn test_stage_names() {
        assert_eq!(AssemblyStage::Init.name(), "INIT");
        assert_eq!(AssemblyStage::LoadTarget.to_string(), "LOAD_TARGET");
        assert_eq!(AssemblyStage::CheatBlend.name(), "CHEAT_BLEND");
        assert!(AssemblyStage::GridFill < AssemblyStage::Done);
    }

    // Tests out-of-order calls are rejected with the current stage
    // Verified by allowing fill before tiles are loaded
    #[test]
    fn test_out_of_order_rejected() {
        let mut assembler = MosaicAssembler::new(small_config()).unwrap();
        assert!(matches!(
            assembler.fill_grid(),
            Err(MosaicError::InvalidStage { stage: "INIT", .. })
        ));
        assert!(matches!(
            assembler.set_tiles(red_blue_tiles(10)),
            Err(MosaicError::InvalidStage { .. })
        ));

        assembler.set_target(split_target()).unwrap();
        assert!(matches!(
            assembler.set_target(split_target()),
            Err(MosaicError::InvalidStage {
                stage: "LOAD_TARGET",
                ..
            })
        ));
        assert!(assembler.cheat_blend().is_err());
        assert_eq!(assembler.stage(), AssemblyStage::LoadTarget);
    }

    // Tests invalid configurations are rejected at construction
    // Verified by deferring validation to the run
    #[test]
    fn test_invalid_config_rejected() {
        let bad_threshold = AssemblyConfig {
            bg_threshold: 1.5,
            ..AssemblyConfig::default()
        };
        let bad_cheat = AssemblyConfig {
            cheat_alpha: -0.1,
            ..AssemblyConfig::default()
        };
        let bad_size = AssemblyConfig {
            tile_size: 0,
            ..AssemblyConfig::default()
        };
        for config in [bad_threshold, bad_cheat, bad_size] {
            assert!(matches!(
                MosaicAssembler::new(config),
                Err(MosaicError::InvalidParameter { .. })
            ));
        }
    }

    // Tests a target smaller than one cell is rejected
    // Verified by producing an empty grid
    #[test]
    fn test_target_too_small() {
        let mut assembler = MosaicAssembler::new(small_config()).unwrap();
        let result = assembler.set_target(RgbImage::new(5, 50));
        assert!(matches!(result, Err(MosaicError::InvalidParameter { .. })));
        assert_eq!(assembler.stage(), AssemblyStage::Init);
    }

    // Tests tiles of the wrong size are rejected
    // Verified by resizing mismatched tiles silently
    #[test]
    fn test_wrong_tile_size_rejected() {
        let config = AssemblyConfig {
            enlargement: 2,
            ..small_config()
        };
        let mut assembler = MosaicAssembler::new(config).unwrap();
        assembler.set_target(split_target()).unwrap();
        assert!(matches!(
            assembler.set_tiles(red_blue_tiles(10)),
            Err(MosaicError::InvalidParameter { .. })
        ));
        assembler.set_tiles(red_blue_tiles(20)).unwrap();
        assert_eq!(assembler.stage(), AssemblyStage::LoadTiles);
    }

    // Tests colour matching places the closest tile in each cell
    // Verified by picking tiles at random
    #[test]
    fn test_fill_matches_colors() {
        let mut assembler = MosaicAssembler::new(small_config()).unwrap();
        assembler.set_target(split_target()).unwrap();
        assembler.set_tiles(red_blue_tiles(10)).unwrap();
        assembler.fill_grid().unwrap();

        let assignments = assembler.assignments().unwrap();
        assert_eq!(assignments.dim(), (2, 4));
        for row in 0..2 {
            assert_eq!(assignments[[row, 0]], CellFill::Tile(0));
            assert_eq!(assignments[[row, 1]], CellFill::Tile(0));
            assert_eq!(assignments[[row, 2]], CellFill::Tile(1));
            assert_eq!(assignments[[row, 3]], CellFill::Tile(1));
        }

        let canvas = assembler.canvas().unwrap();
        assert_eq!(canvas.dimensions(), (40, 20));
        assert_eq!(canvas.get_pixel(5, 5).0, [255, 0, 0]);
        assert_eq!(canvas.get_pixel(35, 15).0, [0, 0, 255]);

        let stats = assembler.statistics();
        assert_eq!(stats.cells_total, 8);
        assert_eq!(stats.tiled_cells, 8);
        assert_eq!(stats.background_cells, 0);
        assert_eq!(assembler.pool().unwrap().usage_count(0), 4);
    }

    // Tests background cells are painted solid and never consume tiles
    // Verified by routing background cells through the pool
    #[test]
    fn test_background_cells_skip_pool() {
        let config = AssemblyConfig {
            background: BackgroundSpec::Fixed([0, 0, 250]),
            ..small_config()
        };
        let mut assembler = MosaicAssembler::new(config).unwrap();
        assembler.set_target(split_target()).unwrap();
        assembler.set_tiles(red_blue_tiles(10)).unwrap();
        assembler.fill_grid().unwrap();

        let pool = assembler.pool().unwrap();
        assert_eq!(pool.usage_count(1), 0);
        assert_eq!(pool.usage_count(0), 4);

        let assignments = assembler.assignments().unwrap();
        assert_eq!(assignments[[0, 3]], CellFill::Background([0, 0, 250]));
        assert_eq!(assembler.canvas().unwrap().get_pixel(39, 19).0, [0, 0, 250]);

        let stats = assembler.statistics();
        assert_eq!(stats.background_cells, 4);
        assert_eq!(stats.tiled_cells, 4);
        assert!((stats.background_fraction() - 0.5).abs() < 1e-12);
        assert_eq!(stats.background_color, Some([0, 0, 250]));
    }

    // Tests automatic background detection from the corners
    // Verified by defaulting auto to white
    #[test]
    fn test_auto_background() {
        let target = RgbImage::from_fn(30, 30, |x, y| {
            if (10..20).contains(&x) && (10..20).contains(&y) {
                Rgb([255, 0, 0])
            } else {
                Rgb([0, 0, 0])
            }
        });
        let config = AssemblyConfig {
            background: BackgroundSpec::Auto,
            corner_sample_size: 5,
            ..small_config()
        };
        let mut assembler = MosaicAssembler::new(config).unwrap();
        assembler.set_target(target).unwrap();
        assert_eq!(assembler.background_color(), Some([0, 0, 0]));

        assembler.set_tiles(red_blue_tiles(10)).unwrap();
        assembler.fill_grid().unwrap();
        assert_eq!(assembler.statistics().background_cells, 8);
        assert_eq!(assembler.assignments().unwrap()[[1, 1]], CellFill::Tile(0));
    }

    // Tests a global tint is applied to placed tiles
    // Verified by placing untinted tiles
    #[test]
    fn test_global_tint() {
        let config = AssemblyConfig {
            tint: Some([0, 0, 0]),
            tint_blend: BlendConfig::new(BlendMode::Normal, 0.5),
            ..small_config()
        };
        let mut assembler = MosaicAssembler::new(config).unwrap();
        assembler.set_target(split_target()).unwrap();
        assembler.set_tiles(red_blue_tiles(10)).unwrap();
        assembler.fill_grid().unwrap();

        let [r, g, b] = assembler.canvas().unwrap().get_pixel(0, 0).0;
        assert!((127..=128).contains(&r));
        assert_eq!((g, b), (0, 0));
    }

    // Tests a region palette replaces the global tint
    // Verified by applying the global tint first
    #[test]
    fn test_region_tint_replaces_global() {
        let palette = RegionPalette::new(
            vec![
                NamedRegion::new("red", [250, 0, 0], Some([255, 255, 255])),
                NamedRegion::new("blue", [0, 0, 250], None),
            ],
            80.0,
        );
        let config = AssemblyConfig {
            tint: Some([0, 0, 0]),
            tint_blend: BlendConfig::new(BlendMode::Normal, 1.0),
            region_palette: Some(palette),
            ..small_config()
        };
        assert_eq!(config.tint_for([250, 0, 0]), Some([255, 255, 255]));
        assert_eq!(config.tint_for([0, 0, 250]), None);

        let mut assembler = MosaicAssembler::new(config).unwrap();
        assembler.set_target(split_target()).unwrap();
        assembler.set_tiles(red_blue_tiles(10)).unwrap();
        assembler.fill_grid().unwrap();

        let canvas = assembler.canvas().unwrap();
        assert_eq!(canvas.get_pixel(0, 0).0, [255, 255, 255]);
        assert_eq!(canvas.get_pixel(39, 0).0, [0, 0, 255]);
    }

    // Tests random selection ignores colour but stays within the pool
    // Verified by falling back to colour matching
    #[test]
    fn test_random_selection() {
        let config = AssemblyConfig {
            color_match: false,
            ..small_config()
        };
        let mut assembler = MosaicAssembler::new(config).unwrap();
        assembler.set_target(split_target()).unwrap();
        assembler.set_tiles(red_blue_tiles(10)).unwrap();
        assembler.fill_grid().unwrap();

        let pool = assembler.pool().unwrap();
        assert_eq!(pool.usage_count(0) + pool.usage_count(1), 8);
        assert_eq!(pool.unused_count(), 0);
    }

    // Tests a no-reuse grid larger than the pool is relaxed with a warning
    // Verified by failing the run on exhaustion
    #[test]
    fn test_capacity_relaxed() {
        let config = AssemblyConfig {
            reuse: ReusePolicy {
                allow_reuse: false,
                min_reuse_distance: 0,
                ..ReusePolicy::default()
            },
            ..small_config()
        };
        let mut assembler = MosaicAssembler::new(config).unwrap();
        assembler.set_target(split_target()).unwrap();
        assembler.set_tiles(red_blue_tiles(10)).unwrap();

        let warnings = &assembler.statistics().warnings;
        assert!(warnings.contains(&RunWarning::LowTileCount { loaded: 2 }));
        assert!(warnings.contains(&RunWarning::CapacityRelaxed {
            cells: 8,
            tiles: 2,
            max_reuse: 5
        }));

        assembler.fill_grid().unwrap();
        let pool = assembler.pool().unwrap();
        assert!(pool.usage_count(0) <= 5 && pool.usage_count(1) <= 5);
    }

    // Tests the cheat blend pulls the canvas toward the target
    // Verified by skipping the blend when alpha is positive
    #[test]
    fn test_cheat_blend() {
        let target = RgbImage::from_pixel(20, 20, Rgb([200, 200, 200]));
        let config = AssemblyConfig {
            cheat_alpha: 0.5,
            ..small_config()
        };
        let mut assembler = MosaicAssembler::new(config).unwrap();
        assembler.set_target(target).unwrap();
        assembler
            .set_tiles(vec![Tile::solid(10, [0, 0, 0], "black")])
            .unwrap();
        assembler.fill_grid().unwrap();
        assembler.cheat_blend().unwrap();

        assert_eq!(assembler.stage(), AssemblyStage::CheatBlend);
        let [r, g, b] = assembler.canvas().unwrap().get_pixel(10, 10).0;
        for channel in [r, g, b] {
            assert!((99..=101).contains(&channel));
        }
    }

    // Tests a zero cheat alpha leaves the canvas unchanged
    // Verified by always blending
    #[test]
    fn test_cheat_blend_zero_alpha() {
        let mut assembler = MosaicAssembler::new(small_config()).unwrap();
        assembler.set_target(split_target()).unwrap();
        assembler.set_tiles(red_blue_tiles(10)).unwrap();
        assembler.fill_grid().unwrap();
        let before = assembler.canvas().unwrap().clone();
        assembler.cheat_blend().unwrap();
        assert_eq!(assembler.canvas().unwrap(), &before);
    }

    // Tests saving writes the canvas and finishes the run
    // Verified by leaving the stage at save
    #[test]
    fn test_save() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("nested").join("out.png");

        let mut assembler = MosaicAssembler::new(small_config()).unwrap();
        assembler.set_target(split_target()).unwrap();
        assembler.set_tiles(red_blue_tiles(10)).unwrap();
        assembler.fill_grid().unwrap();
        assembler.save(&output).unwrap();

        assert_eq!(assembler.stage(), AssemblyStage::Done);
        let written = image::open(&output).unwrap().to_rgb8();
        assert_eq!(written.dimensions(), (40, 20));
        assert_eq!(written.get_pixel(0, 0).0, [255, 0, 0]);
        assert!(assembler.save(&output).is_err());
    }

    // Tests the full run from files on disk
    // Verified by skipping the tile directory scan
    #[test]
    fn test_run_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let target_path = dir.path().join("target.png");
        let tiles_dir = dir.path().join("tiles");
        let output = dir.path().join("mosaic.jpg");
        std::fs::create_dir(&tiles_dir).unwrap();
        split_target().save(&target_path).unwrap();
        RgbImage::from_pixel(30, 30, Rgb([255, 0, 0]))
            .save(tiles_dir.join("red.png"))
            .unwrap();
        RgbImage::from_pixel(30, 30, Rgb([0, 0, 255]))
            .save(tiles_dir.join("blue.png"))
            .unwrap();

        let mut assembler = MosaicAssembler::new(small_config()).unwrap();
        let stats = assembler
            .run(&target_path, &tiles_dir, &output)
            .unwrap()
            .clone();

        assert_eq!(stats.tiles_discovered, 2);
        assert_eq!(stats.tiles_loaded, 2);
        assert_eq!(stats.cells_total, 8);
        assert!(output.exists());
        assert_eq!(assembler.stage(), AssemblyStage::Done);
    }

    // Tests a missing tile directory fails the run
    // Verified by treating it as an empty pool
    #[test]
    fn test_run_missing_tiles_dir() {
        let dir = tempfile::tempdir().unwrap();
        let target_path = dir.path().join("target.png");
        split_target().save(&target_path).unwrap();

        let mut assembler = MosaicAssembler::new(small_config()).unwrap();
        let result = assembler.run(
            &target_path,
            &dir.path().join("missing"),
            &dir.path().join("out.png"),
        );
        assert!(matches!(result, Err(MosaicError::DirectoryNotFound { .. })));
    }
}
