//! Creates a matched pair of demo NetCDF files for CubeVista.
//!
//! Writes a UM-style latitude/longitude file, an LFRic-style UGRID file and
//! the LFRic lat-lon ancillary file into ./example_data, laid out the way
//! `DatasetPaths` resolves them. The fields are synthetic but plausible:
//! a zonally banded relative humidity and a pole-to-equator temperature
//! gradient.

use chrono::Utc;
use cube_vista::config::{DataVariant, DatasetPaths};
use ndarray::{Array1, Array2, Array3};
use netcdf::create;
use std::path::Path;

const NT: usize = 4;
const NY: usize = 36;
const NX: usize = 72;

// UGRID node grid resolution (nodes, not faces).
const MESH_ROWS: usize = 19;
const MESH_COLS: usize = 37;

fn rh_value(t: usize, lat: f64, lon: f64) -> f64 {
    let wave = (lon.to_radians() * 3.0 + t as f64 * 0.5).sin();
    let band = (lat.to_radians() * 2.0).cos();
    (55.0 + 35.0 * band * wave).clamp(0.0, 100.0)
}

fn temp_value(t: usize, lat: f64) -> f64 {
    288.0 - 35.0 * (lat.to_radians()).sin().powi(2) + 1.5 * t as f64
}

fn create_um_file(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    let mut file = create(path)?;

    file.add_attribute("title", "CubeVista demo data (UM lat-lon)")?;
    file.add_attribute(
        "history",
        format!("Created by create_demo_netcdf on {}", Utc::now().to_rfc3339()),
    )?;

    file.add_dimension("time", NT)?;
    file.add_dimension("lat", NY)?;
    file.add_dimension("lon", NX)?;

    let lats: Vec<f64> = (0..NY).map(|i| -87.5 + 5.0 * i as f64).collect();
    let lons: Vec<f64> = (0..NX).map(|i| 2.5 + 5.0 * i as f64).collect();

    {
        let mut var = file.add_variable::<f64>("time", &["time"])?;
        var.put_attribute("units", "hours since 2021-03-24 00:00:00")?;
        var.put_attribute("calendar", "standard")?;
        let data: Vec<f64> = (0..NT).map(|i| 6.0 * i as f64).collect();
        var.put(Array1::from(data).view(), ..)?;
    }
    {
        let mut var = file.add_variable::<f64>("lat", &["lat"])?;
        var.put_attribute("units", "degrees_north")?;
        var.put(Array1::from(lats.clone()).view(), ..)?;
    }
    {
        let mut var = file.add_variable::<f64>("lon", &["lon"])?;
        var.put_attribute("units", "degrees_east")?;
        var.put(Array1::from(lons.clone()).view(), ..)?;
    }

    {
        let mut var = file.add_variable::<f64>("relative_humidity", &["time", "lat", "lon"])?;
        var.put_attribute("units", "%")?;
        var.put_attribute("standard_name", "relative_humidity")?;
        let mut data = Array3::zeros((NT, NY, NX));
        for t in 0..NT {
            for (iy, &lat) in lats.iter().enumerate() {
                for (ix, &lon) in lons.iter().enumerate() {
                    data[[t, iy, ix]] = rh_value(t, lat, lon);
                }
            }
        }
        var.put(data.view(), ..)?;
    }
    {
        let mut var = file.add_variable::<f64>("air_temperature_0", &["time", "lat", "lon"])?;
        var.put_attribute("units", "K")?;
        var.put_attribute("standard_name", "air_temperature")?;
        let mut data = Array3::zeros((NT, NY, NX));
        for t in 0..NT {
            for (iy, &lat) in lats.iter().enumerate() {
                for ix in 0..NX {
                    data[[t, iy, ix]] = temp_value(t, lat);
                }
            }
        }
        var.put(data.view(), ..)?;
    }

    Ok(())
}

fn create_lfric_file(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    let mut file = create(path)?;

    file.add_attribute("title", "CubeVista demo data (LFRic UGRID)")?;
    file.add_attribute(
        "history",
        format!("Created by create_demo_netcdf on {}", Utc::now().to_rfc3339()),
    )?;

    let n_nodes = MESH_ROWS * MESH_COLS;
    let n_faces = (MESH_ROWS - 1) * (MESH_COLS - 1);

    file.add_dimension("time", NT)?;
    file.add_dimension("nMesh2d_node", n_nodes)?;
    file.add_dimension("nMesh2d_face", n_faces)?;
    file.add_dimension("nMesh2d_vertex", 4)?;

    {
        let mut mesh = file.add_variable::<i32>("Mesh2d", &[])?;
        mesh.put_attribute("cf_role", "mesh_topology")?;
        mesh.put_attribute("topology_dimension", 2i32)?;
        mesh.put_attribute("node_coordinates", "Mesh2d_node_x Mesh2d_node_y")?;
        mesh.put_attribute("face_node_connectivity", "Mesh2d_face_nodes")?;
    }

    let mut node_lon = Vec::with_capacity(n_nodes);
    let mut node_lat = Vec::with_capacity(n_nodes);
    for row in 0..MESH_ROWS {
        for col in 0..MESH_COLS {
            node_lon.push(-180.0 + 360.0 * col as f64 / (MESH_COLS - 1) as f64);
            node_lat.push(-90.0 + 180.0 * row as f64 / (MESH_ROWS - 1) as f64);
        }
    }
    {
        let mut var = file.add_variable::<f64>("Mesh2d_node_x", &["nMesh2d_node"])?;
        var.put_attribute("units", "degrees_east")?;
        var.put(Array1::from(node_lon.clone()).view(), ..)?;
    }
    {
        let mut var = file.add_variable::<f64>("Mesh2d_node_y", &["nMesh2d_node"])?;
        var.put_attribute("units", "degrees_north")?;
        var.put(Array1::from(node_lat.clone()).view(), ..)?;
    }

    // One-based connectivity, the way LFRic writes it.
    let mut conn = Array2::<i32>::zeros((n_faces, 4));
    let mut face = 0;
    for row in 0..MESH_ROWS - 1 {
        for col in 0..MESH_COLS - 1 {
            let base = (row * MESH_COLS + col) as i32;
            conn[[face, 0]] = base + 1;
            conn[[face, 1]] = base + 2;
            conn[[face, 2]] = base + MESH_COLS as i32 + 2;
            conn[[face, 3]] = base + MESH_COLS as i32 + 1;
            face += 1;
        }
    }
    {
        let mut var = file.add_variable::<i32>("Mesh2d_face_nodes", &["nMesh2d_face", "nMesh2d_vertex"])?;
        var.put_attribute("start_index", 1i32)?;
        var.put(conn.view(), ..)?;
    }

    {
        let mut var = file.add_variable::<f64>("time", &["time"])?;
        var.put_attribute("units", "hours since 2021-03-24 00:00:00")?;
        let data: Vec<f64> = (0..NT).map(|i| 6.0 * i as f64).collect();
        var.put(Array1::from(data).view(), ..)?;
    }

    // Face centers, for sampling the synthetic fields.
    let face_center = |f: usize| -> (f64, f64) {
        let mut lon = 0.0;
        let mut lat = 0.0;
        for v in 0..4 {
            let node = (conn[[f, v]] - 1) as usize;
            lon += node_lon[node];
            lat += node_lat[node];
        }
        (lon / 4.0, lat / 4.0)
    };

    let mut face_vars: Vec<(&str, &str, Box<dyn Fn(usize, f64, f64) -> f64>)> = Vec::new();
    face_vars.push((
        "relative_humidity_at_screen_level",
        "%",
        Box::new(|t, lat, lon| rh_value(t, lat, lon)),
    ));
    face_vars.push(("air_temperature", "K", Box::new(|t, lat, _| temp_value(t, lat))));
    face_vars.push((
        "surface_altitude",
        "m",
        Box::new(|_, lat, lon| {
            (600.0 * (lat.to_radians() * 3.0).sin() * (lon.to_radians() * 2.0).cos()).max(0.0)
        }),
    ));

    for (name, units, value) in face_vars {
        let mut var = file.add_variable::<f64>(name, &["time", "nMesh2d_face"])?;
        var.put_attribute("units", units)?;
        var.put_attribute("mesh", "Mesh2d")?;
        var.put_attribute("location", "face")?;
        let mut data = Array2::zeros((NT, n_faces));
        for t in 0..NT {
            for f in 0..n_faces {
                let (lon, lat) = face_center(f);
                data[[t, f]] = value(t, lat, lon);
            }
        }
        var.put(data.view(), ..)?;
    }

    Ok(())
}

fn create_lfric_latlon_file(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    let mut file = create(path)?;

    file.add_dimension("time", 1)?;
    file.add_dimension("lat", NY)?;
    file.add_dimension("lon", NX)?;

    let lats: Vec<f64> = (0..NY).map(|i| -87.5 + 5.0 * i as f64).collect();
    let lons: Vec<f64> = (0..NX).map(|i| 2.5 + 5.0 * i as f64).collect();
    {
        let mut var = file.add_variable::<f64>("lat", &["lat"])?;
        var.put_attribute("units", "degrees_north")?;
        var.put(Array1::from(lats.clone()).view(), ..)?;
    }
    {
        let mut var = file.add_variable::<f64>("lon", &["lon"])?;
        var.put_attribute("units", "degrees_east")?;
        var.put(Array1::from(lons.clone()).view(), ..)?;
    }
    {
        let mut var = file.add_variable::<f64>("surface_altitude", &["time", "lat", "lon"])?;
        var.put_attribute("units", "m")?;
        let mut data = Array3::zeros((1, NY, NX));
        for (iy, &lat) in lats.iter().enumerate() {
            for (ix, &lon) in lons.iter().enumerate() {
                data[[0, iy, ix]] =
                    (600.0 * (lat.to_radians() * 3.0).sin() * (lon.to_radians() * 2.0).cos()).max(0.0);
            }
        }
        var.put(data.view(), ..)?;
    }

    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let data_dir = Path::new("./example_data");
    std::fs::create_dir_all(data_dir)?;
    let paths = DatasetPaths::for_variant(data_dir, DataVariant::C48);

    println!("Creating demo dataset under {}", data_dir.display());
    create_um_file(&paths.um_filepath)?;
    create_lfric_file(&paths.lfric_filepath)?;
    create_lfric_latlon_file(&paths.lfric_latlon_filepath)?;

    println!("Wrote:");
    println!("   {}", paths.um_filepath.display());
    println!("   {}", paths.lfric_filepath.display());
    println!("   {}", paths.lfric_latlon_filepath.display());
    println!("\nTry:");
    println!("   cargo run -- --data-dir ./example_data --list-vars");
    println!("   cargo run -- --data-dir ./example_data -n relative_humidity --single-time");
    println!(
        "   cargo run -- --data-dir ./example_data --compare relative_humidity:relative_humidity_at_screen_level"
    );

    Ok(())
}
