mod gui;

use std::time::Duration;

use gui::engage_gui;
use mocaprelay::dummy_sensor::DummySensor;
use mocaprelay::registry::ConnectionRegistry;

fn main() {
    env_logger::init();

    let mut sensors: Vec<DummySensor> = ["Head", "LeftArm", "RightArm"]
        .iter()
        .map(|_| {
            DummySensor::spawn(Duration::from_millis(33)).expect("could not bind a local port")
        })
        .collect();

    let registry = ConnectionRegistry::new();
    for (target, sensor) in ["Head", "LeftArm", "RightArm"].iter().zip(&sensors) {
        registry
            .connect(target, &sensor.endpoint())
            .expect("local endpoint was rejected");
    }

    let snapshot_registry = registry.clone();
    let _ = engage_gui(Box::new(move || snapshot_registry.snapshot()));

    for sensor in &mut sensors {
        sensor.stop();
    }
}
