//! Comprehensive unit tests for CubeVista modules
//!
//! These tests exercise the public API: error reporting, dataset layout
//! resolution, cube slicing, mesh conversion and plot composition, without
//! touching real data files.

use glam::Vec3;
use ndarray::{array, ArrayD};
use cube_vista::{
    colormap::{ColorMap, ScalarMapper},
    config::{DataVariant, DatasetPaths},
    cube::{Coord, Cube},
    errors::CubeVistaError,
    mesh::{lonlat_to_xyz, Mesh, ScalarLocation},
    plot::{dual_view, single_view, DualViewOptions, GeoPlotter, MeshOptions, OrbitCamera},
    ugrid::{DataLocation, MeshTopology},
};

fn structured_rh_cube() -> Cube {
    let (nt, ny, nx) = (4, 10, 20);
    let data = ArrayD::from_shape_vec(
        vec![nt, ny, nx],
        (0..nt * ny * nx).map(|i| (i % 101) as f64).collect(),
    )
    .unwrap();
    let lats: Vec<f64> = (0..ny).map(|i| -81.0 + 18.0 * i as f64).collect();
    let lons: Vec<f64> = (0..nx).map(|i| 9.0 + 18.0 * i as f64).collect();
    Cube {
        name: "relative_humidity".to_string(),
        units: "%".to_string(),
        dim_names: vec!["time".to_string(), "lat".to_string(), "lon".to_string()],
        data,
        coords: vec![
            Coord::new("time", "hours since 2021-03-24", array![0.0, 6.0, 12.0, 18.0]),
            Coord::new("lat", "degrees_north", lats.into()),
            Coord::new("lon", "degrees_east", lons.into()),
        ],
        mesh: None,
        location: None,
    }
}

fn unstructured_temp_cube() -> Cube {
    // A 2x2 band of quads over a 3x3 node grid.
    let mut node_lon = Vec::new();
    let mut node_lat = Vec::new();
    for row in 0..3 {
        for col in 0..3 {
            node_lon.push(-60.0 + 60.0 * col as f64);
            node_lat.push(-30.0 + 30.0 * row as f64);
        }
    }
    let face_node = array![[0, 1, 4, 3], [1, 2, 5, 4], [3, 4, 7, 6], [4, 5, 8, 7]];
    let topology = MeshTopology {
        node_lon: node_lon.into(),
        node_lat: node_lat.into(),
        face_node,
        start_index: 0,
    };
    Cube {
        name: "air_temperature".to_string(),
        units: "K".to_string(),
        dim_names: vec!["nMesh2d_face".to_string()],
        data: ArrayD::from_shape_vec(vec![4], vec![270.0, 280.0, 290.0, 300.0]).unwrap(),
        coords: vec![],
        mesh: Some(topology),
        location: Some(DataLocation::Face),
    }
}

fn empty_paths() -> DatasetPaths {
    DatasetPaths::for_variant("/nonexistent", DataVariant::C48)
}

#[test]
fn test_error_types() {
    let netcdf_err = CubeVistaError::NetCDFError(netcdf::Error::NotFound("test".to_string()));
    assert!(format!("{}", netcdf_err).contains("NetCDF error"));

    let generic_err = CubeVistaError::Generic("Test error".to_string());
    assert_eq!(format!("{}", generic_err), "Test error");

    let var_err = CubeVistaError::VariableNotFound {
        var: "temp".to_string(),
    };
    assert!(format!("{}", var_err).contains("Variable 'temp' not found"));

    let ambiguous = CubeVistaError::AmbiguousVariable {
        name: "air_temperature".to_string(),
        matches: vec!["air_temperature".to_string(), "air_temperature_0".to_string()],
    };
    let text = format!("{}", ambiguous);
    assert!(text.contains("more than one variable"));
    assert!(text.contains("air_temperature_0"));

    let location_err = CubeVistaError::UnsupportedLocation {
        location: "node".to_string(),
    };
    assert!(format!("{}", location_err).contains("must be 'face'"));

    let geometry_err = CubeVistaError::UnsupportedGeometry {
        message: "too few points".to_string(),
    };
    assert!(format!("{}", geometry_err).contains("too few points"));
}

#[test]
fn test_dataset_paths_layout() {
    let paths = DatasetPaths::for_variant("/data", DataVariant::C48);
    for (file, suffix) in [
        (&paths.um_filepath, "_um_latlon.nc"),
        (&paths.lfric_filepath, "_lf_ugrid.nc"),
        (&paths.lfric_latlon_filepath, "_lf_latlon.nc"),
    ] {
        let name = file.file_name().unwrap().to_str().unwrap();
        assert!(name.ends_with(suffix), "{name} should end with {suffix}");
        assert!(file.starts_with("/data"));
    }
}

#[test]
fn test_structured_mesh_face_count_property() {
    let cube = structured_rh_cube().slice_first_time().unwrap();
    let mesh = Mesh::from_cube(&cube).unwrap();

    // With inferred bounds, each axis has len + 1 edges, so the face count
    // is exactly (len(x_bounds) - 1) * (len(y_bounds) - 1).
    assert_eq!(mesh.n_faces(), 10 * 20);
    assert_eq!(mesh.n_points(), 11 * 21);
    assert!(mesh.points.iter().all(|p| (p.length() - 1.0).abs() < 1e-5));
}

#[test]
fn test_structured_round_trip_with_nan_filtering() {
    let mut cube = structured_rh_cube().slice_first_time().unwrap();
    cube.data[[3, 7]] = f64::NAN;
    cube.data[[9, 19]] = f64::NAN;

    let mesh = Mesh::from_cube(&cube).unwrap();
    let original: Vec<f64> = cube.data.iter().copied().collect();

    // Before filtering the scalar field equals the per-cell data exactly
    // (NaN compares unequal, so compare positionally).
    assert_eq!(mesh.scalars.len(), original.len());
    for (a, b) in mesh.scalars.iter().zip(original.iter()) {
        assert!((a.is_nan() && b.is_nan()) || a == b);
    }

    // After filtering, exactly the finite values survive, in order.
    let filtered = mesh.threshold();
    let expected: Vec<f64> = original.into_iter().filter(|v| v.is_finite()).collect();
    assert_eq!(filtered.scalars, expected);
    assert_eq!(filtered.n_faces(), mesh.n_faces() - 2);
}

#[test]
fn test_unstructured_counts_and_start_index() {
    let cube = unstructured_temp_cube();
    let mesh = Mesh::from_cube(&cube).unwrap();
    assert_eq!(mesh.n_faces(), cube.mesh.as_ref().unwrap().n_faces());
    assert_eq!(mesh.n_points(), cube.mesh.as_ref().unwrap().n_nodes());

    // The same topology declared one-based resolves to identical faces.
    let mut one_based = unstructured_temp_cube();
    {
        let topo = one_based.mesh.as_mut().unwrap();
        topo.face_node += 1;
        topo.start_index = 1;
    }
    let mesh_one = Mesh::from_cube(&one_based).unwrap();
    assert_eq!(mesh.faces, mesh_one.faces);
}

#[test]
fn test_unstructured_rejects_non_face_locations() {
    for location in [DataLocation::Node, DataLocation::Edge] {
        let mut cube = unstructured_temp_cube();
        cube.location = Some(location);
        // Scalar length no longer matters; location is checked first.
        let err = Mesh::from_unstructured(&cube).unwrap_err();
        match err {
            CubeVistaError::UnsupportedLocation { location: loc } => {
                assert_eq!(loc, location.as_str());
            }
            other => panic!("expected UnsupportedLocation, got {other:?}"),
        }
    }
}

#[test]
fn test_dual_view_linked_camera_invariant() {
    let left = Mesh::from_cube(&structured_rh_cube().slice_first_time().unwrap()).unwrap();
    let right = Mesh::from_cube(&unstructured_temp_cube()).unwrap();
    let mut plotter = dual_view(&left, &right, &empty_paths(), DualViewOptions::default()).unwrap();

    // Simulated interaction on subplot 0: rotate, then zoom.
    plotter.rotate_camera(0, 0.35, 0.1);
    plotter.rotate_camera(0, -0.1, 0.05);
    plotter.zoom_camera(0, 0.8);

    let (a, b) = (plotter.camera(0), plotter.camera(1));
    assert_eq!(a, b);
    assert_eq!(a.view_matrix(), b.view_matrix());
}

#[test]
fn test_dual_view_shared_colormap_range() {
    let left = Mesh::from_cube(&structured_rh_cube().slice_first_time().unwrap()).unwrap();
    let right = Mesh::from_cube(&unstructured_temp_cube()).unwrap();
    let plotter = dual_view(&left, &right, &empty_paths(), DualViewOptions::default()).unwrap();

    let expected = ScalarMapper::shared(ColorMap::Magma, &[&left, &right]);
    for subplot in plotter.subplots() {
        let mapper = &subplot.meshes[0].mapper;
        assert_eq!(mapper.min, expected.min);
        assert_eq!(mapper.max, expected.max);
    }
}

#[test]
fn test_single_view_composition() {
    let mesh = Mesh::from_cube(&structured_rh_cube().slice_first_time().unwrap()).unwrap();
    let plotter = single_view(&mesh, &empty_paths(), None).unwrap();

    assert_eq!(plotter.n_subplots(), 1);
    assert_eq!(plotter.title(), "relative_humidity / %");
    let subplot = &plotter.subplots()[0];
    assert!(subplot.show_base_layer);
    assert!(subplot.show_axes);
    // No coastline file exists at the fake path, so the overlay is skipped.
    assert!(subplot.coastlines.is_none());
}

#[test]
fn test_plotter_defaults_and_camera_reset() {
    let mut plotter = GeoPlotter::with_shape(1, 2);
    assert_eq!(plotter.n_subplots(), 2);
    assert!(!plotter.is_linked());
    assert_eq!(plotter.title(), "CubeVista");

    plotter.rotate_camera(1, 1.0, 0.3);
    plotter.view_xz();
    assert_eq!(*plotter.camera(1), OrbitCamera::view_xz());
}

#[test]
fn test_mesh_options_clim_overrides_data_range() {
    let mesh = Mesh::from_cube(&unstructured_temp_cube()).unwrap();
    let mut plotter = GeoPlotter::new();
    plotter.add_mesh(
        mesh,
        MeshOptions {
            show_edges: false,
            cmap: ColorMap::Viridis,
            clim: Some((250.0, 320.0)),
        },
    );
    let mapper = &plotter.subplots()[0].meshes[0].mapper;
    assert_eq!(mapper.min, 250.0);
    assert_eq!(mapper.max, 320.0);
}

#[test]
fn test_node_scalars_validate_against_node_count() {
    let cube = unstructured_temp_cube();
    let topo = cube.mesh.clone().unwrap();
    let mesh = Mesh {
        name: "node_field".to_string(),
        units: "1".to_string(),
        points: (0..topo.n_nodes())
            .map(|i| lonlat_to_xyz(topo.node_lon[i], topo.node_lat[i]))
            .collect(),
        faces: topo.face_node.iter().map(|&i| i as u32).collect(),
        verts_per_face: 4,
        scalars: vec![1.0; topo.n_nodes()],
        scalar_location: ScalarLocation::Node,
    };
    assert_eq!(mesh.scalars.len(), mesh.n_points());

    // A node-located mesh thresholds faces touching NaN nodes.
    let mut with_nan = mesh.clone();
    with_nan.scalars[4] = f64::NAN; // the shared center node
    let filtered = with_nan.threshold();
    assert_eq!(filtered.n_faces(), 0);
    assert_eq!(filtered.n_points(), mesh.n_points());
}

#[test]
fn test_projection_axes_are_geographic() {
    // Greenwich equator looks down +x, 90E +y, the pole +z.
    assert!((lonlat_to_xyz(0.0, 0.0) - Vec3::X).length() < 1e-6);
    assert!((lonlat_to_xyz(90.0, 0.0) - Vec3::Y).length() < 1e-6);
    assert!((lonlat_to_xyz(0.0, 90.0) - Vec3::Z).length() < 1e-6);
    assert!((lonlat_to_xyz(-90.0, 0.0) + Vec3::Y).length() < 1e-6);
}
