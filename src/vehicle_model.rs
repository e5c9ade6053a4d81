#[cfg(feature = "carla")]
use carla::rpc::VehiclePhysicsControl;
use serde::Deserialize;

/// Converts a path curvature into a steering wheel angle.
pub trait VehicleModel {
    /// Returns the steering angle in radians for `curvature` (1/m) at `speed` (m/s).
    fn steer_from_curvature(&self, curvature: f64, speed: f64) -> f64;
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VehicleGeometry {
    pub mass: f64,
    pub wheelbase: f64,
    pub center_to_front: f64,
    pub tire_stiffness_front: f64,
    pub tire_stiffness_rear: f64,
    pub steer_ratio: f64,
}

impl VehicleGeometry {
    /// Takes the vehicle mass reported by the simulator, keeping the rest.
    #[cfg(feature = "carla")]
    pub fn with_physics_control(self, physics_control: &VehiclePhysicsControl) -> Self {
        let VehiclePhysicsControl { mass, .. } = *physics_control;
        Self {
            mass: mass as f64,
            ..self
        }
    }

    pub(crate) fn violations(&self) -> Vec<String> {
        let Self {
            mass,
            wheelbase,
            center_to_front,
            tire_stiffness_front,
            tire_stiffness_rear,
            steer_ratio,
        } = *self;
        let mut errors = Vec::new();

        for (field, value) in [
            ("vehicle.mass", mass),
            ("vehicle.wheelbase", wheelbase),
            ("vehicle.tire_stiffness_front", tire_stiffness_front),
            ("vehicle.tire_stiffness_rear", tire_stiffness_rear),
            ("vehicle.steer_ratio", steer_ratio),
        ] {
            if !(value.is_finite() && value > 0.0) {
                errors.push(format!("{field} must be > 0, got {value}"));
            }
        }
        if !(center_to_front > 0.0 && center_to_front < wheelbase) {
            errors.push(format!(
                "vehicle.center_to_front must lie in (0, {wheelbase}), got {center_to_front}"
            ));
        }

        errors
    }
}

/// Steady-state linear bicycle model.
#[derive(Debug, Clone, PartialEq)]
pub struct BicycleModel {
    wheelbase: f64,
    steer_ratio: f64,
    slip_factor: f64,
}

impl BicycleModel {
    pub fn new(geometry: &VehicleGeometry) -> Self {
        let VehicleGeometry {
            mass,
            wheelbase,
            center_to_front,
            tire_stiffness_front: cf,
            tire_stiffness_rear: cr,
            steer_ratio,
        } = *geometry;
        let center_to_rear = wheelbase - center_to_front;
        let slip_factor =
            mass * (cf * center_to_front - cr * center_to_rear) / (wheelbase.powi(2) * cf * cr);

        Self {
            wheelbase,
            steer_ratio,
            slip_factor,
        }
    }

    /// Negative for an understeering vehicle.
    pub fn slip_factor(&self) -> f64 {
        self.slip_factor
    }
}

impl VehicleModel for BicycleModel {
    fn steer_from_curvature(&self, curvature: f64, speed: f64) -> f64 {
        let Self {
            wheelbase,
            steer_ratio,
            slip_factor,
        } = *self;
        curvature * steer_ratio * wheelbase * (1.0 - slip_factor * speed.powi(2))
    }
}
