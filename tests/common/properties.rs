//! Backend-independent checks of the dense operations
//!
//! Each check takes a client and a device of any runtime, builds its inputs
//! with `Storage::from_slice` and reads results back with `to_vec`, so the
//! same assertions run on the CPU, on the emulated accelerator and on CUDA.

use super::{
    assert_allclose_f64, identity, lower_part, matmul, random_lower, random_matrix, random_spd,
    rng, transpose, upper_part,
};
use numla::error::Error;
use numla::matrix::Storage;
use numla::ops::{CholeskyOps, GemmOps, Side, Triangle, TriangularOps, WriteRequest};
use numla::runtime::{Runtime, RuntimeClient};
use rand::rngs::StdRng;

/// Client providing every f64 operation
pub trait DenseClient<R: Runtime>:
    RuntimeClient<R> + GemmOps<R, f64> + TriangularOps<R, f64> + CholeskyOps<R, f64>
{
}

impl<R, C> DenseClient<R> for C
where
    R: Runtime,
    C: RuntimeClient<R> + GemmOps<R, f64> + TriangularOps<R, f64> + CholeskyOps<R, f64>,
{
}

pub const TOL: f64 = 1e-10;

pub fn store<R: Runtime>(data: &[f64], device: &R::Device) -> Storage<R> {
    Storage::<R>::from_slice(data, device).unwrap()
}

pub fn read<R: Runtime, C: RuntimeClient<R>>(client: &C, storage: &Storage<R>) -> Vec<f64> {
    client.synchronize();
    storage.to_vec::<f64>().unwrap()
}

/// `A = 2I`, `B = I`, fresh `C`: `C = 2I` for overwrite, `4I` for accumulate on `C = 2I`
pub fn two_by_two_scenario<R: Runtime, C: DenseClient<R>>(client: &C, device: &R::Device) {
    let a = store::<R>(&[2.0, 0.0, 0.0, 2.0], device);
    let b = store::<R>(&[1.0, 0.0, 0.0, 1.0], device);

    let c = Storage::<R>::zeros::<f64>(4, device).unwrap();
    client
        .gemm(
            &a.matrix::<f64>(2, 2).unwrap(),
            &b.matrix::<f64>(2, 2).unwrap(),
            &c.matrix::<f64>(2, 2).unwrap(),
            1.0,
            0.0,
            false,
            false,
        )
        .unwrap();
    assert_eq!(read(client, &c), vec![2.0, 0.0, 0.0, 2.0]);

    client
        .gemm_request(
            &a.matrix::<f64>(2, 2).unwrap(),
            &b.matrix::<f64>(2, 2).unwrap(),
            &c.matrix::<f64>(2, 2).unwrap(),
            false,
            false,
            WriteRequest::AddTo,
        )
        .unwrap();
    assert_eq!(read(client, &c), vec![4.0, 0.0, 0.0, 4.0]);
}

/// Every write intent, with and without transposed operands
pub fn gemm_write_requests<R: Runtime, C: DenseClient<R>>(client: &C, device: &R::Device) {
    let mut rng = rng(11);
    let (m, k, n) = (3, 4, 2);
    let a = random_matrix(&mut rng, m, k);
    let b = random_matrix(&mut rng, k, n);
    let c0 = random_matrix(&mut rng, m, n);
    let product = matmul(&a, &b, m, k, n);

    for (ta, tb) in [(false, false), (true, false), (false, true), (true, true)] {
        let a_data = if ta { transpose(&a, m, k) } else { a.clone() };
        let b_data = if tb { transpose(&b, k, n) } else { b.clone() };
        let (a_rows, a_cols) = if ta { (k, m) } else { (m, k) };
        let (b_rows, b_cols) = if tb { (n, k) } else { (k, n) };
        let sa = store::<R>(&a_data, device);
        let sb = store::<R>(&b_data, device);

        for req in [
            WriteRequest::NullOp,
            WriteRequest::WriteTo,
            WriteRequest::WriteInplace,
            WriteRequest::AddTo,
        ] {
            let sc = store::<R>(&c0, device);
            client
                .gemm_request(
                    &sa.matrix::<f64>(a_rows, a_cols).unwrap(),
                    &sb.matrix::<f64>(b_rows, b_cols).unwrap(),
                    &sc.matrix::<f64>(m, n).unwrap(),
                    ta,
                    tb,
                    req,
                )
                .unwrap();
            let got = read(client, &sc);
            let msg = format!("gemm {req:?} ta={ta} tb={tb}");
            match req {
                WriteRequest::NullOp => assert_eq!(got, c0, "{msg}"),
                WriteRequest::WriteTo | WriteRequest::WriteInplace => {
                    assert_allclose_f64(&got, &product, TOL, TOL, &msg)
                }
                WriteRequest::AddTo => {
                    let expected: Vec<f64> = c0.iter().zip(&product).map(|(c, p)| c + p).collect();
                    assert_allclose_f64(&got, &expected, TOL, TOL, &msg)
                }
            }
        }
    }
}

/// With `beta == 0` a NaN-filled output is overwritten, not propagated
pub fn gemm_beta_zero_ignores_output<R: Runtime, C: DenseClient<R>>(client: &C, device: &R::Device) {
    let a = store::<R>(&[1.0, 2.0, 3.0, 4.0], device);
    let b = store::<R>(&[1.0, 0.0, 0.0, 1.0], device);
    let c = store::<R>(&[f64::NAN; 4], device);
    client
        .gemm(
            &a.matrix::<f64>(2, 2).unwrap(),
            &b.matrix::<f64>(2, 2).unwrap(),
            &c.matrix::<f64>(2, 2).unwrap(),
            1.0,
            0.0,
            false,
            false,
        )
        .unwrap();
    assert_eq!(read(client, &c), vec![1.0, 2.0, 3.0, 4.0]);
}

/// Views with a leading dimension larger than their width leave padding alone
pub fn gemm_leading_dimension<R: Runtime, C: DenseClient<R>>(client: &C, device: &R::Device) {
    let mut rng = rng(12);
    // 2x3 A inside a 2x5 buffer, 3x2 B inside 3x4, 2x2 C inside 2x3
    let a_full = random_matrix(&mut rng, 2, 5);
    let b_full = random_matrix(&mut rng, 3, 4);
    let c_full = vec![-7.0; 6];

    let a = store::<R>(&a_full, device);
    let b = store::<R>(&b_full, device);
    let c = store::<R>(&c_full, device);
    client
        .gemm(
            &a.matrix_with_ld::<f64>(2, 3, 5).unwrap(),
            &b.matrix_with_ld::<f64>(3, 2, 4).unwrap(),
            &c.matrix_with_ld::<f64>(2, 2, 3).unwrap(),
            1.0,
            0.0,
            false,
            false,
        )
        .unwrap();

    let got = read(client, &c);
    for i in 0..2 {
        for j in 0..2 {
            let expected: f64 = (0..3).map(|p| a_full[i * 5 + p] * b_full[p * 4 + j]).sum();
            assert!((got[i * 3 + j] - expected).abs() < TOL, "C[{i},{j}]");
        }
        assert_eq!(got[i * 3 + 2], -7.0, "padding of row {i}");
    }
}

/// Triangular operand in `triangle`, row-major
fn triangular(rng: &mut StdRng, n: usize, triangle: Triangle) -> Vec<f64> {
    let l = random_lower(rng, n);
    match triangle {
        Triangle::Lower => l,
        Triangle::Upper => transpose(&l, n, n),
    }
}

/// TRSM followed by TRMM with the same `op(A)` and side restores `B`
pub fn trsm_trmm_inverse<R: Runtime, C: DenseClient<R>>(client: &C, device: &R::Device) {
    let mut rng = rng(13);
    let (m, n) = (4, 3);

    for side in [Side::Left, Side::Right] {
        for triangle in [Triangle::Lower, Triangle::Upper] {
            for trans in [false, true] {
                let order = if side == Side::Left { m } else { n };
                let a = store::<R>(&triangular(&mut rng, order, triangle), device);
                let b0 = random_matrix(&mut rng, m, n);
                let b = store::<R>(&b0, device);
                let av = a.matrix::<f64>(order, order).unwrap();
                let bv = b.matrix::<f64>(m, n).unwrap();

                client.trsm(&av, &bv, 2.0, side, triangle, trans).unwrap();
                client.trmm(&av, &bv, 0.5, side, triangle, trans).unwrap();

                let msg = format!("trsm/trmm {side:?} {triangle:?} trans={trans}");
                assert_allclose_f64(&read(client, &b), &b0, 1e-9, 1e-9, &msg);
            }
        }
    }
}

/// TRSM result satisfies `op(A) · X = alpha · B` against a host product
pub fn trsm_solves_system<R: Runtime, C: DenseClient<R>>(client: &C, device: &R::Device) {
    let mut rng = rng(14);
    let n = 5;
    let l = random_lower(&mut rng, n);
    let b0 = random_matrix(&mut rng, n, 2);

    let a = store::<R>(&l, device);
    let b = store::<R>(&b0, device);
    client
        .trsm(
            &a.matrix::<f64>(n, n).unwrap(),
            &b.matrix::<f64>(n, 2).unwrap(),
            3.0,
            Side::Left,
            Triangle::Lower,
            true,
        )
        .unwrap();

    let x = read(client, &b);
    let lt_x = matmul(&transpose(&l, n, n), &x, n, n, 2);
    let expected: Vec<f64> = b0.iter().map(|v| 3.0 * v).collect();
    assert_allclose_f64(&lt_x, &expected, 1e-9, 1e-9, "Lᵀ·X = 3B");
}

/// POTRF factors reproduce the input; the other triangle is untouched
pub fn potrf_reconstructs<R: Runtime, C: DenseClient<R>>(client: &C, device: &R::Device) {
    let mut rng = rng(15);
    let n = 6;
    let spd = random_spd(&mut rng, n);

    for triangle in [Triangle::Lower, Triangle::Upper] {
        let a = store::<R>(&spd, device);
        client.potrf(&a.matrix::<f64>(n, n).unwrap(), triangle).unwrap();
        let got = read(client, &a);

        let rebuilt = match triangle {
            Triangle::Lower => {
                let l = lower_part(&got, n);
                matmul(&l, &transpose(&l, n, n), n, n, n)
            }
            Triangle::Upper => {
                let u = upper_part(&got, n);
                matmul(&transpose(&u, n, n), &u, n, n, n)
            }
        };
        assert_allclose_f64(&rebuilt, &spd, 1e-10, 1e-10, &format!("potrf {triangle:?}"));

        for i in 0..n {
            for j in 0..n {
                let untouched = match triangle {
                    Triangle::Lower => j > i,
                    Triangle::Upper => j < i,
                };
                if untouched {
                    assert_eq!(got[i * n + j], spd[i * n + j], "{triangle:?} [{i},{j}]");
                }
            }
        }
    }
}

/// `A · POTRI(POTRF(A)) = I`
pub fn potri_inverts<R: Runtime, C: DenseClient<R>>(client: &C, device: &R::Device) {
    let mut rng = rng(16);
    let n = 5;
    let spd = random_spd(&mut rng, n);

    for triangle in [Triangle::Lower, Triangle::Upper] {
        let a = store::<R>(&spd, device);
        let view = a.matrix::<f64>(n, n).unwrap();
        client.potrf(&view, triangle).unwrap();
        client.potri(&view, triangle).unwrap();

        let inverse = read(client, &a);
        let product = matmul(&spd, &inverse, n, n, n);
        assert_allclose_f64(&product, &identity(n), 1e-9, 1e-9, &format!("potri {triangle:?}"));
    }
}

/// POTRI on a matrix with padding between rows
pub fn potri_leading_dimension<R: Runtime, C: DenseClient<R>>(client: &C, device: &R::Device) {
    let mut rng = rng(17);
    let (n, ld) = (4, 6);
    let spd = random_spd(&mut rng, n);
    let mut padded = vec![9.5; n * ld];
    for i in 0..n {
        padded[i * ld..i * ld + n].copy_from_slice(&spd[i * n..(i + 1) * n]);
    }

    let a = store::<R>(&padded, device);
    let view = a.matrix_with_ld::<f64>(n, n, ld).unwrap();
    client.potrf(&view, Triangle::Lower).unwrap();
    client.potri(&view, Triangle::Lower).unwrap();

    let got = read(client, &a);
    let mut inverse = vec![0.0; n * n];
    for i in 0..n {
        inverse[i * n..(i + 1) * n].copy_from_slice(&got[i * ld..i * ld + n]);
        assert!(got[i * ld + n..(i + 1) * ld].iter().all(|&v| v == 9.5), "padding row {i}");
    }
    let product = matmul(&spd, &inverse, n, n, n);
    assert_allclose_f64(&product, &identity(n), 1e-9, 1e-9, "padded potri");
}

fn stacked(rng: &mut StdRng, batch: usize, f: impl Fn(&mut StdRng) -> Vec<f64>) -> Vec<f64> {
    (0..batch).flat_map(|_| f(rng)).collect()
}

/// Batched GEMM on rectangular slices against the host product
pub fn batched_gemm_rectangular<R: Runtime, C: DenseClient<R>>(client: &C, device: &R::Device) {
    let mut rng = rng(19);
    let (batch, m, k, n) = (2, 3, 4, 2);
    for (ta, tb) in [(false, false), (true, false), (false, true), (true, true)] {
        let a_shape = if ta { (k, m) } else { (m, k) };
        let b_shape = if tb { (n, k) } else { (k, n) };
        let a = stacked(&mut rng, batch, |r| random_matrix(r, a_shape.0, a_shape.1));
        let b = stacked(&mut rng, batch, |r| random_matrix(r, b_shape.0, b_shape.1));

        let (sa, sb) = (store::<R>(&a, device), store::<R>(&b, device));
        let sc = store::<R>(&vec![0.0; batch * m * n], device);
        client
            .batch_gemm(
                &sa.batch::<f64>(batch, a_shape.0, a_shape.1).unwrap(),
                &sb.batch::<f64>(batch, b_shape.0, b_shape.1).unwrap(),
                &sc.batch::<f64>(batch, m, n).unwrap(),
                1.0,
                0.0,
                ta,
                tb,
            )
            .unwrap();
        let got = read(client, &sc);

        for i in 0..batch {
            let ai = &a[i * m * k..(i + 1) * m * k];
            let bi = &b[i * k * n..(i + 1) * k * n];
            let ai = if ta { transpose(ai, k, m) } else { ai.to_vec() };
            let bi = if tb { transpose(bi, n, k) } else { bi.to_vec() };
            let expected = matmul(&ai, &bi, m, k, n);
            let msg = format!("batch_gemm slice {i} ta={ta} tb={tb}");
            assert_allclose_f64(&got[i * m * n..(i + 1) * m * n], &expected, TOL, TOL, &msg);
        }
    }
}

/// Batched forms match a loop of single calls slice by slice
pub fn batched_matches_loop<R: Runtime, C: DenseClient<R>>(client: &C, device: &R::Device) {
    let mut rng = rng(18);
    let (batch, n) = (3, 4);
    let a = stacked(&mut rng, batch, |r| random_matrix(r, n, n));
    let b = stacked(&mut rng, batch, |r| random_matrix(r, n, n));
    let c = stacked(&mut rng, batch, |r| random_matrix(r, n, n));
    let tri = stacked(&mut rng, batch, |r| random_lower(r, n));
    let spd = stacked(&mut rng, batch, |r| random_spd(r, n));
    let slice = |data: &[f64], i: usize| data[i * n * n..(i + 1) * n * n].to_vec();

    // gemm
    let (sa, sb, sc) = (store::<R>(&a, device), store::<R>(&b, device), store::<R>(&c, device));
    client
        .batch_gemm(
            &sa.batch::<f64>(batch, n, n).unwrap(),
            &sb.batch::<f64>(batch, n, n).unwrap(),
            &sc.batch::<f64>(batch, n, n).unwrap(),
            1.5,
            0.5,
            true,
            false,
        )
        .unwrap();
    let batched = read(client, &sc);
    for i in 0..batch {
        let (ai, bi, ci) = (store::<R>(&slice(&a, i), device), store::<R>(&slice(&b, i), device), store::<R>(&slice(&c, i), device));
        client
            .gemm(
                &ai.matrix::<f64>(n, n).unwrap(),
                &bi.matrix::<f64>(n, n).unwrap(),
                &ci.matrix::<f64>(n, n).unwrap(),
                1.5,
                0.5,
                true,
                false,
            )
            .unwrap();
        assert_allclose_f64(&slice(&batched, i), &read(client, &ci), TOL, TOL, "batch_gemm");
    }

    // trsm and trmm
    for solve in [true, false] {
        let (st, sb) = (store::<R>(&tri, device), store::<R>(&b, device));
        let (tv, bv) = (st.batch::<f64>(batch, n, n).unwrap(), sb.batch::<f64>(batch, n, n).unwrap());
        if solve {
            client.batch_trsm(&tv, &bv, 1.0, Side::Right, Triangle::Lower, false).unwrap();
        } else {
            client.batch_trmm(&tv, &bv, 1.0, Side::Right, Triangle::Lower, false).unwrap();
        }
        let batched = read(client, &sb);
        for i in 0..batch {
            let (ti, bi) = (store::<R>(&slice(&tri, i), device), store::<R>(&slice(&b, i), device));
            let (tv, bv) = (ti.matrix::<f64>(n, n).unwrap(), bi.matrix::<f64>(n, n).unwrap());
            if solve {
                client.trsm(&tv, &bv, 1.0, Side::Right, Triangle::Lower, false).unwrap();
            } else {
                client.trmm(&tv, &bv, 1.0, Side::Right, Triangle::Lower, false).unwrap();
            }
            let msg = if solve { "batch_trsm" } else { "batch_trmm" };
            assert_allclose_f64(&slice(&batched, i), &read(client, &bi), TOL, TOL, msg);
        }
    }

    // potrf then potri
    let s = store::<R>(&spd, device);
    let view = s.batch::<f64>(batch, n, n).unwrap();
    client.batch_potrf(&view, Triangle::Upper).unwrap();
    client.batch_potri(&view, Triangle::Upper).unwrap();
    let batched = read(client, &s);
    for i in 0..batch {
        let si = store::<R>(&slice(&spd, i), device);
        let v = si.matrix::<f64>(n, n).unwrap();
        client.potrf(&v, Triangle::Upper).unwrap();
        client.potri(&v, Triangle::Upper).unwrap();
        let single = read(client, &si);
        assert_allclose_f64(&slice(&batched, i), &single, 1e-9, 1e-9, "batch_potri");

        let product = matmul(&slice(&spd, i), &single, n, n, n);
        assert_allclose_f64(&product, &identity(n), 1e-9, 1e-9, "batched inverse");
    }
}

fn assert_dimension_mismatch(err: Error, op: &str) {
    match err {
        Error::DimensionMismatch { op: got, .. } => assert_eq!(got, op),
        other => panic!("expected DimensionMismatch for {op}, got {other:?}"),
    }
}

/// Inconsistent shapes and batch counts are rejected and leave outputs alone
pub fn rejects_bad_dimensions<R: Runtime, C: DenseClient<R>>(client: &C, device: &R::Device) {
    let a = store::<R>(&[1.0; 12], device);
    let b = store::<R>(&[1.0; 12], device);
    let c = store::<R>(&[5.0; 16], device);

    // 3x4 · 3x4
    let err = client
        .gemm(
            &a.matrix::<f64>(3, 4).unwrap(),
            &b.matrix::<f64>(3, 4).unwrap(),
            &c.matrix::<f64>(3, 4).unwrap(),
            1.0,
            0.0,
            false,
            false,
        )
        .unwrap_err();
    assert!(err.is_precondition());
    assert!(err.to_string().contains("inputs A and B"), "{err}");
    assert_eq!(read(client, &c), vec![5.0; 16]);

    // 3x4 where a square matrix is required
    let rect = a.matrix::<f64>(3, 4).unwrap();
    assert_dimension_mismatch(client.potrf(&rect, Triangle::Lower).unwrap_err(), "potrf");
    assert_dimension_mismatch(client.potri(&rect, Triangle::Lower).unwrap_err(), "potri");
    let square_b = c.matrix::<f64>(3, 3).unwrap();
    assert_dimension_mismatch(
        client.trsm(&rect, &square_b, 1.0, Side::Left, Triangle::Lower, false).unwrap_err(),
        "trsm",
    );
    assert_dimension_mismatch(
        client.trmm(&rect, &square_b, 1.0, Side::Left, Triangle::Lower, false).unwrap_err(),
        "trmm",
    );
    assert_eq!(read(client, &a), vec![1.0; 12]);

    // batch counts 4 vs 5
    let four = Storage::<R>::zeros::<f64>(4, device).unwrap();
    let five = Storage::<R>::zeros::<f64>(5, device).unwrap();
    let err = client
        .batch_gemm(
            &four.batch::<f64>(4, 1, 1).unwrap(),
            &five.batch::<f64>(5, 1, 1).unwrap(),
            &four.batch::<f64>(4, 1, 1).unwrap(),
            1.0,
            0.0,
            false,
            false,
        )
        .unwrap_err();
    assert!(matches!(err, Error::BatchSizeMismatch { a: 4, b: 5, c: 4 }), "{err:?}");

    let err = client
        .batch_trsm(
            &four.batch::<f64>(4, 1, 1).unwrap(),
            &five.batch::<f64>(5, 1, 1).unwrap(),
            1.0,
            Side::Left,
            Triangle::Lower,
            false,
        )
        .unwrap_err();
    assert!(matches!(err, Error::BatchSizeMismatch { .. }), "{err:?}");

    let err = client
        .batch_potrf(&four.batch::<f64>(0, 1, 1).unwrap(), Triangle::Lower)
        .unwrap_err();
    assert!(matches!(err, Error::EmptyBatch), "{err:?}");
}

/// Run every backend-independent check
pub fn run_all<R: Runtime, C: DenseClient<R>>(client: &C, device: &R::Device) {
    two_by_two_scenario(client, device);
    gemm_write_requests(client, device);
    gemm_beta_zero_ignores_output(client, device);
    gemm_leading_dimension(client, device);
    trsm_trmm_inverse(client, device);
    trsm_solves_system(client, device);
    potrf_reconstructs(client, device);
    potri_inverts(client, device);
    potri_leading_dimension(client, device);
    batched_matches_loop(client, device);
    batched_gemm_rectangular(client, device);
    rejects_bad_dimensions(client, device);
}
