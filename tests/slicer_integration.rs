use skyslicer::camera::FocalPlane;
use skyslicer::footprint::ChipSelection;
use skyslicer::healpix::HealpixGrid;
use skyslicer::maps::GalacticCoordsMap;
use skyslicer::metrics::{CountMetric, MeanMetric, run_metric};
use skyslicer::slice_points::SlicePoints;
use skyslicer::table::ObservationTable;
use skyslicer::{SlicerConfig, SlicerError, SpatialSlicer};

const SURVEY_CSV: &str = "\
observationId,fieldRA,fieldDec,rotSkyPos,observationStartMJD,filter,airmass
0,10.0,-30.0,0.0,60000.1,r,1.05
1,10.5,-30.2,45.0,60000.2,g,1.10
2,11.0,-29.8,90.0,60001.3,r,1.20
3,150.0,20.0,0.0,60002.0,i,1.50
4,10.2,-30.1,180.0,60003.5,z,1.00
";

fn survey() -> ObservationTable {
    ObservationTable::from_csv_reader(SURVEY_CSV.as_bytes()).unwrap()
}

#[test]
fn healpix_count_from_csv() {
    let obs = survey();
    assert_eq!(obs.text("filter").unwrap()[3], "i");

    // Pixels are ~7 deg across at depth 3; a 10 deg radius reaches every pixel's corners.
    let grid = HealpixGrid::new(3).unwrap();
    let config = SlicerConfig {
        radius: 10.0,
        ..SlicerConfig::default()
    };
    let mut slicer = SpatialSlicer::new(config, SlicePoints::healpix(grid)).unwrap();
    slicer.setup_slicer(&obs, &[&GalacticCoordsMap], None).unwrap();
    assert_eq!(slicer.shape(), 768);

    let counts = run_metric(&slicer, &obs, &CountMetric).unwrap();
    let covered: f64 = counts.iter().filter(|&&c| c > 0.0).sum();
    assert!(covered >= 5.0, "every observation lands in at least one slice");
    assert!(counts.iter().any(|&c| c == -666.0));

    let home = grid.pixel_of(10f64.to_radians(), (-30f64).to_radians()) as usize;
    let slice = slicer.query(home).unwrap();
    assert_eq!(slice.indices, vec![0, 1, 2, 4]);
    assert!(!slice.indices.contains(&3));
    assert!(slice.slice_point.contains_key("galb"));
    assert_eq!(slice.slice_point["nside"].as_scalar(), Some(8.0));

    let means = run_metric(&slicer, &obs, &MeanMetric::new("airmass")).unwrap();
    assert!((means[home] - 1.0875).abs() < 1e-12, "{}", means[home]);
}

#[test]
fn footprint_mode_end_to_end() {
    let obs = survey();
    let points = SlicePoints::from_lon_lat(&[10.0, 150.0, 300.0], &[-30.0, 20.0, 0.0], true).unwrap();
    let config = SlicerConfig {
        use_camera: true,
        verbose: false,
        ..SlicerConfig::default()
    };
    let mut slicer = SpatialSlicer::new(config, points).unwrap();
    let camera = FocalPlane::lsst_like();
    slicer.setup_slicer(&obs, &[], Some(&camera)).unwrap();

    for slice in slicer.iter().unwrap() {
        let chips = slice.chip_names.expect("footprint mode reports chips");
        assert_eq!(chips.len(), slice.indices.len());
        assert!(slice.indices.windows(2).all(|w| w[0] < w[1]));
    }

    let target = slicer.query(1).unwrap();
    assert_eq!(target.indices, vec![3]);
    assert_eq!(target.chip_names, Some(vec!["R:2,2 S:1,1".to_string()]));
    assert!(slicer.query(2).unwrap().indices.is_empty());
}

#[test]
fn footprint_allow_list_end_to_end() {
    let obs = survey();
    let points = SlicePoints::from_lon_lat(&[150.0], &[20.0], true).unwrap();
    let config = SlicerConfig {
        use_camera: true,
        chip_names: ChipSelection::only(["R:0,2 S:0,0"]),
        ..SlicerConfig::default()
    };
    let mut slicer = SpatialSlicer::new(config, points).unwrap();
    slicer
        .setup_slicer(&obs, &[], Some(&FocalPlane::lsst_like()))
        .unwrap();
    let slice = slicer.query(0).unwrap();
    assert!(slice.indices.is_empty());
    assert_eq!(slice.chip_names, Some(Vec::new()));
}

#[test]
fn error_contract() {
    let obs = survey();
    let grid = HealpixGrid::new(0).unwrap();
    let mut slicer = SpatialSlicer::new(SlicerConfig::default(), SlicePoints::healpix(grid)).unwrap();

    assert!(matches!(slicer.query(0), Err(SlicerError::NotReady)));

    let footprint_only = SlicerConfig {
        use_camera: true,
        ..SlicerConfig::default()
    };
    let mut needs_camera = SpatialSlicer::new(footprint_only, SlicePoints::healpix(grid)).unwrap();
    assert!(matches!(
        needs_camera.setup_slicer(&obs, &[], None),
        Err(SlicerError::Configuration(_))
    ));

    slicer.setup_slicer(&obs, &[], None).unwrap();
    assert!(matches!(
        slicer.query(12),
        Err(SlicerError::IndexOutOfRange { index: 12, nslice: 12 })
    ));
}
