use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use approx::assert_relative_eq;
use rand::SeedableRng;
use rand::rngs::StdRng;
use sbi_core::{Device, DeviceInventory, DeviceResolver, Error, Tensor};
use sbi_prob::{BatchedDistribution, BoxUniform, BoxUniformOptions, check_prior_on_device};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("sbi_prob=debug")
        .try_init();
}

fn inventory(json: &str) -> Arc<dyn DeviceResolver> {
    Arc::new(DeviceInventory::from_json(json).unwrap())
}

fn unit_square(resolver: Arc<dyn DeviceResolver>) -> BoxUniform {
    BoxUniform::with_options(
        Tensor::zeros(&[2]),
        Tensor::full(&[2], 1.0),
        BoxUniformOptions::default(),
        resolver,
    )
    .unwrap()
}

#[test]
fn samples_stay_inside_the_box() {
    init_tracing();
    let prior = unit_square(inventory("{}"));
    let mut rng = StdRng::seed_from_u64(2024);
    let theta = prior.sample(&[1000], &mut rng).unwrap();
    assert_eq!(theta.shape(), &[1000, 2]);
    assert!(theta.data().iter().all(|v| (0.0..1.0).contains(v)));

    let lp = prior.log_prob(&theta).unwrap();
    assert_eq!(lp.shape(), &[1000]);
    for &v in lp.data() {
        assert_relative_eq!(v, 0.0, epsilon = 1e-12);
    }
}

#[test]
fn outside_points_get_neg_infinity() {
    let prior = unit_square(inventory("{}"));
    let x = Tensor::from_rows(&[vec![0.5, 1.5], vec![-0.1, 0.5], vec![0.25, 0.75]]).unwrap();
    let lp = prior.log_prob(&x).unwrap();
    assert_eq!(lp.data()[0], f64::NEG_INFINITY);
    assert_eq!(lp.data()[1], f64::NEG_INFINITY);
    assert_relative_eq!(lp.data()[2], 0.0, epsilon = 1e-12);
}

#[test]
fn gpu_without_accelerator_is_an_error() {
    let options: BoxUniformOptions = serde_json::from_str(r#"{"device": "gpu"}"#).unwrap();
    let err = BoxUniform::with_options(
        Tensor::zeros(&[2]),
        Tensor::full(&[2], 1.0),
        options,
        inventory("{}"),
    )
    .unwrap_err();
    assert!(matches!(err, Error::DeviceUnavailable(_)));
}

#[test]
fn gpu_falls_back_to_mps() {
    let options = BoxUniformOptions { device: Some("gpu".into()), ..Default::default() };
    let prior = BoxUniform::with_options(
        Tensor::zeros(&[2]),
        Tensor::full(&[2], 1.0),
        options,
        inventory(r#"{"mps": true}"#),
    )
    .unwrap();
    assert_eq!(prior.device(), Device::Mps(0));
}

#[test]
fn relocation_is_visible_through_shared_handles() {
    init_tracing();
    let shared = Rc::new(RefCell::new(unit_square(inventory(r#"{"cuda": [0]}"#))));
    let held_by_trainer = Rc::clone(&shared);

    shared.borrow_mut().to("cuda:0").unwrap();

    let prior = held_by_trainer.borrow();
    assert_eq!(prior.device(), Device::Cuda(0));
    assert_eq!(prior.low().device(), Device::Cuda(0));
    let mut rng = StdRng::seed_from_u64(1);
    assert_eq!(prior.sample(&[4], &mut rng).unwrap().device(), Device::Cuda(0));
    check_prior_on_device(Device::Cuda(0), Some(&*prior), &mut rng).unwrap();
}

#[test]
fn relocating_to_the_same_device_changes_nothing() {
    let mut prior = unit_square(inventory("{}"));
    let before = prior.sample(&[16], &mut StdRng::seed_from_u64(5)).unwrap();
    let x = Tensor::from_vec(vec![0.2, 0.9]);
    let lp_before = prior.log_prob(&x).unwrap();

    prior.to("cpu").unwrap();

    assert_eq!(prior.sample(&[16], &mut StdRng::seed_from_u64(5)).unwrap(), before);
    assert_eq!(prior.log_prob(&x).unwrap(), lp_before);
}

#[test]
fn unknown_cuda_ordinal_is_rejected() {
    let mut prior = unit_square(inventory(r#"{"cuda": [0]}"#));
    assert!(prior.relocate("cuda:3").is_err());
    assert_eq!(prior.device(), Device::Cpu);
}

#[test]
fn matrix_bounds_with_partial_reinterpretation() {
    let options = BoxUniformOptions { reinterpreted_batch_ndims: 1, device: None };
    let prior = BoxUniform::with_options(
        Tensor::zeros(&[2, 3]),
        Tensor::full(&[2, 3], 2.0),
        options,
        inventory("{}"),
    )
    .unwrap();
    assert_eq!(prior.batch_shape(), vec![2]);
    assert_eq!(prior.event_shape(), vec![3]);

    let x = Tensor::full(&[5, 2, 3], 1.0);
    let lp = prior.log_prob(&x).unwrap();
    assert_eq!(lp.shape(), &[5, 2]);
    assert_relative_eq!(lp.data()[0], -3.0 * 2.0f64.ln(), epsilon = 1e-12);
    assert_eq!(prior.support_contains(&x).unwrap().len(), 10);
}
