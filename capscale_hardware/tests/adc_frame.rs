use capscale_hardware::adc::{average_frame, pack_word};
use capscale_hardware::error::HwError;
use capscale_hardware::{SensorModel, SimulatedSensor};
use capscale_traits::RawReadingSource;
use rstest::rstest;

fn frame(ch0: &[i32], ch1: i32) -> Vec<u32> {
    ch0.iter().map(|&c| pack_word(c, ch1).unwrap()).collect()
}

#[rstest]
#[case(&[10, 20, 30, 40], 4, 25)]
#[case(&[10, 20, 30, 40], 2, 15)]
#[case(&[10, 20, 30, 40], 0, 10)] // count floors at 1
#[case(&[10, 20, 30, 40], 100, 25)] // count caps at the frame length
#[case(&[1, 2], 2, 2)] // 1.5 rounds away from zero
#[case(&[-1, -2], 2, -2)] // -1.5 rounds away from zero
#[case(&[-8192, 8191], 2, -1)] // -0.5 -> -1
fn averages_channel_zero(#[case] ch0: &[i32], #[case] n: u32, #[case] expected: i32) {
    let words = frame(ch0, 0);
    let (a0, a1) = average_frame(&words, n).unwrap();
    assert_eq!(a0, expected);
    assert_eq!(a1, 0);
}

#[rstest]
fn channels_are_independent() {
    let words = frame(&[100, 100, 100], -50);
    assert_eq!(average_frame(&words, 3).unwrap(), (100, -50));
}

#[rstest]
fn empty_frame_is_an_error() {
    let err = average_frame(&[], 4).expect_err("empty frame must fail");
    assert!(matches!(err, HwError::EmptyFrame));
}

#[rstest]
fn noisy_sensor_averages_close_to_the_noise_free_counts() {
    let model = SensorModel {
        noise_counts: 4.0,
        seed: 7,
        ..SensorModel::default()
    };
    let mut sensor = SimulatedSensor::new(model);
    sensor.place(300.0);
    let expected = model.counts(300.0);
    let got = f64::from(sensor.averaged_reading(1024).unwrap().primary);
    assert!((got - expected).abs() <= 1.0, "got {got}, expected ~{expected}");
}
