use manigraph::{compute_laplacian_matrix, Geometry, Params, LAPLACIAN_METHODS};
use ndarray::Array2;
use rand::prelude::*;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // RUST_LOG=debug shows cache hits and recomputes.
    env_logger::init();

    // Noisy circle in 3D: a one-dimensional manifold sampled unevenly.
    let mut rng = StdRng::seed_from_u64(7);
    let n = 400;
    let points = Array2::from_shape_fn((n, 3), |(i, j)| {
        let t = std::f64::consts::TAU * (i as f64 / n as f64).powf(1.5);
        let noise = 0.02 * (rng.random::<f64>() - 0.5);
        match j {
            0 => t.cos() + noise,
            1 => t.sin() + noise,
            _ => noise,
        }
    });

    let mut geom = Geometry::new()
        .with_adjacency_params(Params::new().with("radius", 0.3))
        .with_affinity_params(Params::new().with("radius", 0.15));
    geom.set_data_matrix(points.view());

    let lap = geom.compute_laplacian_matrix(&Params::new())?;
    println!("geometric laplacian: {}x{}, nnz={}", lap.rows(), lap.cols(), lap.nnz());

    let adjacency = geom.compute_adjacency_matrix(&Params::new())?;
    let degrees: Vec<usize> = adjacency.outer_iterator().map(|row| row.nnz()).collect();
    let min = degrees.iter().min().copied().unwrap_or(0);
    let max = degrees.iter().max().copied().unwrap_or(0);
    println!("neighbors per point: min={min}, max={max} (cached, not recomputed)");

    // Every normalization of the same affinity graph.
    let affinity = geom.compute_affinity_matrix(&Params::new())?.clone();
    for method in LAPLACIAN_METHODS {
        let l = compute_laplacian_matrix(&affinity, method, &Params::new().with("scaling_epps", 0.5))?;
        let trace: f64 = (0..n).filter_map(|i| l.get(i, i)).sum();
        println!("{method:>20}: trace={trace:.3}");
    }

    // A wider neighborhood drops the cached affinity and Laplacian.
    let wider = geom.compute_adjacency_matrix(&Params::new().with("radius", 0.5))?;
    println!("radius 0.5: nnz={}", wider.nnz());
    println!("laplacian still cached: {}", geom.laplacian_matrix().is_some());

    Ok(())
}
