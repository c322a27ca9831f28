#![warn(missing_docs)]

//! Declarative world descriptions for tether physics engines.
//!
//! This crate defines the in-memory form of a simulation world: models made
//! of links, the collision shapes attached to those links, and the joints
//! connecting them. It plays the role a parsed robot/world markup file plays
//! for a physics plugin: engines consume these values, they never parse text
//! themselves.
//!
//! Descriptions are purely declarative. Nothing here touches a physics
//! engine; construction is handled by the engine adapters.
//!
//! Units are SI (meters, kilograms, seconds, radians).

mod error;

pub use error::{DescriptionError, Result};

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Name used by joints to refer to the fixed world frame as their parent.
pub const WORLD_FRAME: &str = "world";

/// 3D vector with f64 components.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    /// X component.
    pub x: f64,
    /// Y component.
    pub y: f64,
    /// Z component.
    pub z: f64,
}

impl Vec3 {
    /// Create a new Vec3.
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// The zero vector.
    pub fn zero() -> Self {
        Self::default()
    }
}

/// Rigid placement: translation plus roll/pitch/yaw in radians.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Pose {
    /// Translation in meters.
    pub position: Vec3,
    /// Roll, pitch, yaw in radians (applied X, then Y, then Z).
    pub rotation: Vec3,
}

impl Pose {
    /// Identity pose.
    pub fn identity() -> Self {
        Self::default()
    }

    /// Pure translation.
    pub fn from_position(x: f64, y: f64, z: f64) -> Self {
        Self {
            position: Vec3::new(x, y, z),
            rotation: Vec3::zero(),
        }
    }
}

/// Collision geometry, centered on the collision frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Geometry {
    /// Box with full side lengths along each axis.
    Box {
        /// Size along each axis.
        size: Vec3,
    },
    /// Sphere.
    Sphere {
        /// Radius.
        radius: f64,
    },
    /// Cylinder along the Z axis.
    Cylinder {
        /// Radius.
        radius: f64,
        /// Full length along Z.
        length: f64,
    },
    /// Capsule along the Z axis.
    Capsule {
        /// Radius of the caps.
        radius: f64,
        /// Length of the cylindrical section.
        length: f64,
    },
    /// Infinite plane through the origin.
    Plane {
        /// Plane normal (need not be unit length).
        normal: Vec3,
    },
}

impl Geometry {
    fn validate(&self, name: &str) -> Result<()> {
        let positive = |field: &'static str, value: f64| {
            if value > 0.0 && value.is_finite() {
                Ok(())
            } else {
                Err(DescriptionError::InvalidValue {
                    name: name.to_string(),
                    field,
                    value,
                })
            }
        };
        match self {
            Geometry::Box { size } => {
                positive("size.x", size.x)?;
                positive("size.y", size.y)?;
                positive("size.z", size.z)
            }
            Geometry::Sphere { radius } => positive("radius", *radius),
            Geometry::Cylinder { radius, length } | Geometry::Capsule { radius, length } => {
                positive("radius", *radius)?;
                positive("length", *length)
            }
            Geometry::Plane { normal } => {
                let len = (normal.x * normal.x + normal.y * normal.y + normal.z * normal.z).sqrt();
                positive("normal", len)
            }
        }
    }
}

/// Contact surface parameters of a collision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Surface {
    /// Coulomb friction coefficient.
    pub friction: f64,
    /// Restitution coefficient.
    pub restitution: f64,
    /// Slip compliance along the primary friction direction.
    pub slip1: f64,
    /// Slip compliance along the secondary friction direction.
    pub slip2: f64,
    /// Primary friction direction, expressed in the world frame.
    ///
    /// `None` selects the world X axis.
    pub fdir1: Option<Vec3>,
}

impl Default for Surface {
    fn default() -> Self {
        Self {
            friction: 1.0,
            restitution: 0.0,
            slip1: 0.0,
            slip2: 0.0,
            fdir1: None,
        }
    }
}

/// A collision shape attached to a link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collision {
    /// Name, unique within the link.
    pub name: String,
    /// Pose relative to the link frame.
    #[serde(default)]
    pub pose: Pose,
    /// Shape geometry.
    pub geometry: Geometry,
    /// Contact parameters.
    #[serde(default)]
    pub surface: Surface,
}

impl Collision {
    /// Create a collision with default surface parameters.
    pub fn new(name: impl Into<String>, geometry: Geometry) -> Self {
        Self {
            name: name.into(),
            pose: Pose::identity(),
            geometry,
            surface: Surface::default(),
        }
    }
}

/// Mass properties of a link.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Inertial {
    /// Mass in kilograms.
    pub mass: f64,
    /// Center of mass relative to the link frame.
    #[serde(default)]
    pub center_of_mass: Vec3,
    /// Principal moments of inertia. `None` derives them from the collisions.
    #[serde(default)]
    pub inertia: Option<Vec3>,
}

/// A rigid body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    /// Name, unique within the model.
    pub name: String,
    /// Pose relative to the model frame.
    #[serde(default)]
    pub pose: Pose,
    /// Mass properties. `None` gives unit mass and unit principal inertia.
    #[serde(default)]
    pub inertial: Option<Inertial>,
    /// Collision shapes.
    #[serde(default)]
    pub collisions: Vec<Collision>,
}

impl Link {
    /// Create a link with no collisions and default mass.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pose: Pose::identity(),
            inertial: None,
            collisions: Vec::new(),
        }
    }

    /// Validate names and numeric fields of this link.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(DescriptionError::EmptyName("link"));
        }
        if let Some(inertial) = &self.inertial {
            if !(inertial.mass > 0.0 && inertial.mass.is_finite()) {
                return Err(DescriptionError::InvalidValue {
                    name: self.name.clone(),
                    field: "mass",
                    value: inertial.mass,
                });
            }
            if let Some(inertia) = inertial.inertia {
                for value in [inertia.x, inertia.y, inertia.z] {
                    if !(value >= 0.0 && value.is_finite()) {
                        return Err(DescriptionError::InvalidValue {
                            name: self.name.clone(),
                            field: "inertia",
                            value,
                        });
                    }
                }
            }
        }
        let mut seen = HashSet::new();
        for collision in &self.collisions {
            if !seen.insert(collision.name.as_str()) {
                return Err(DescriptionError::DuplicateName {
                    kind: "collision",
                    name: collision.name.clone(),
                    scope: self.name.clone(),
                });
            }
            collision.geometry.validate(&collision.name)?;
        }
        Ok(())
    }
}

/// Kind of joint connecting two links.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JointKind {
    /// Rigid attachment.
    Fixed,
    /// Rotation about an axis.
    Revolute {
        /// Rotation axis in the joint frame.
        axis: Vec3,
        /// Optional (lower, upper) limits in radians.
        #[serde(default)]
        limits: Option<(f64, f64)>,
    },
    /// Translation along an axis.
    Prismatic {
        /// Translation axis in the joint frame.
        axis: Vec3,
        /// Optional (lower, upper) limits in meters.
        #[serde(default)]
        limits: Option<(f64, f64)>,
    },
    /// Free rotation about a point.
    Ball,
}

/// A joint between a parent link (or the world) and a child link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Joint {
    /// Name, unique within the model.
    pub name: String,
    /// Parent link name, or [`WORLD_FRAME`].
    pub parent: String,
    /// Child link name.
    pub child: String,
    /// Joint frame relative to the child link frame.
    #[serde(default)]
    pub pose: Pose,
    /// Joint type and axis.
    pub kind: JointKind,
}

/// A model: a named group of links and joints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    /// Model name.
    pub name: String,
    /// Pose relative to the world frame.
    #[serde(default)]
    pub pose: Pose,
    /// Static models never move.
    #[serde(default, rename = "static")]
    pub is_static: bool,
    /// Links of this model.
    #[serde(default)]
    pub links: Vec<Link>,
    /// Joints of this model.
    #[serde(default)]
    pub joints: Vec<Joint>,
}

impl Model {
    /// Create an empty, non-static model.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pose: Pose::identity(),
            is_static: false,
            links: Vec::new(),
            joints: Vec::new(),
        }
    }

    /// Look up a link by name.
    pub fn link(&self, name: &str) -> Option<&Link> {
        self.links.iter().find(|l| l.name == name)
    }

    /// Validate links, joints and name uniqueness.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(DescriptionError::EmptyName("model"));
        }
        let mut links = HashSet::new();
        for link in &self.links {
            link.validate()?;
            if !links.insert(link.name.as_str()) {
                return Err(DescriptionError::DuplicateName {
                    kind: "link",
                    name: link.name.clone(),
                    scope: self.name.clone(),
                });
            }
        }

        let mut joints = HashSet::new();
        for joint in &self.joints {
            if !joints.insert(joint.name.as_str()) {
                return Err(DescriptionError::DuplicateName {
                    kind: "joint",
                    name: joint.name.clone(),
                    scope: self.name.clone(),
                });
            }
            if joint.parent != WORLD_FRAME && !links.contains(joint.parent.as_str()) {
                return Err(DescriptionError::UnknownLink {
                    joint: joint.name.clone(),
                    link: joint.parent.clone(),
                });
            }
            if !links.contains(joint.child.as_str()) {
                return Err(DescriptionError::UnknownLink {
                    joint: joint.name.clone(),
                    link: joint.child.clone(),
                });
            }
        }
        Ok(())
    }
}

/// A simulation world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct World {
    /// World name.
    pub name: String,
    /// Gravity in m/s^2.
    #[serde(default = "default_gravity")]
    pub gravity: Vec3,
    /// Fixed step size in seconds. `None` uses the engine default.
    #[serde(default)]
    pub time_step: Option<f64>,
    /// Models, in construction order.
    #[serde(default)]
    pub models: Vec<Model>,
}

fn default_gravity() -> Vec3 {
    Vec3::new(0.0, 0.0, -9.8)
}

impl World {
    /// Create an empty world with standard gravity.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            gravity: default_gravity(),
            time_step: None,
            models: Vec::new(),
        }
    }

    /// Look up a model by name.
    pub fn model(&self, name: &str) -> Option<&Model> {
        self.models.iter().find(|m| m.name == name)
    }

    /// Validate every model and require unique model names.
    pub fn validate(&self) -> Result<()> {
        if let Some(dt) = self.time_step {
            if !(dt > 0.0 && dt.is_finite()) {
                return Err(DescriptionError::InvalidValue {
                    name: self.name.clone(),
                    field: "time_step",
                    value: dt,
                });
            }
        }
        let mut seen = HashSet::new();
        for model in &self.models {
            model.validate()?;
            if !seen.insert(model.name.as_str()) {
                return Err(DescriptionError::DuplicateName {
                    kind: "model",
                    name: model.name.clone(),
                    scope: self.name.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Top-level description file: one or more worlds.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Root {
    /// Worlds in file order.
    #[serde(default)]
    pub worlds: Vec<World>,
}

impl Root {
    /// Deserialize from a JSON string and validate.
    pub fn from_json(json: &str) -> Result<Self> {
        let root: Root = serde_json::from_str(json)?;
        root.validate()?;
        Ok(root)
    }

    /// Deserialize from a TOML string and validate.
    pub fn from_toml(text: &str) -> Result<Self> {
        let root: Root = toml::from_str(text)?;
        root.validate()?;
        Ok(root)
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// World at the given position.
    pub fn world_by_index(&self, index: usize) -> Option<&World> {
        self.worlds.get(index)
    }

    /// World with the given name.
    pub fn world_by_name(&self, name: &str) -> Option<&World> {
        self.worlds.iter().find(|w| w.name == name)
    }

    fn validate(&self) -> Result<()> {
        self.worlds.iter().try_for_each(World::validate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn box_model(name: &str) -> Model {
        let mut link = Link::new("box_link");
        link.inertial = Some(Inertial {
            mass: 1.0,
            center_of_mass: Vec3::zero(),
            inertia: None,
        });
        link.collisions.push(Collision::new(
            "box_collision",
            Geometry::Box {
                size: Vec3::new(1.0, 1.0, 1.0),
            },
        ));
        let mut model = Model::new(name);
        model.links.push(link);
        model
    }

    #[test]
    fn json_root_loads_and_validates() {
        let mut world = World::new("default");
        world.models.push(box_model("box"));
        let root = Root {
            worlds: vec![world],
        };

        let json = root.to_json().expect("serialize");
        let restored = Root::from_json(&json).expect("deserialize");

        assert_eq!(root, restored);
        let world = restored.world_by_index(0).unwrap();
        assert_eq!(world.gravity, Vec3::new(0.0, 0.0, -9.8));
        assert!(world.model("box").unwrap().link("box_link").is_some());
    }

    #[test]
    fn toml_defaults_are_filled_in() {
        let text = r#"
            [[worlds]]
            name = "w"

            [[worlds.models]]
            name = "ground"
            static = true

            [[worlds.models.links]]
            name = "plane"

            [[worlds.models.links.collisions]]
            name = "plane_collision"
            geometry = { type = "plane", normal = { x = 0.0, y = 0.0, z = 1.0 } }
        "#;
        let root = Root::from_toml(text).expect("parse");
        let model = &root.worlds[0].models[0];
        assert!(model.is_static);
        let surface = model.links[0].collisions[0].surface;
        assert_eq!(surface.friction, 1.0);
        assert_eq!(surface.slip1, 0.0);
        assert_eq!(surface.fdir1, None);
    }

    #[test]
    fn duplicate_model_names_are_rejected() {
        let mut world = World::new("w");
        world.models.push(box_model("box"));
        world.models.push(box_model("box"));
        let err = world.validate().unwrap_err();
        assert!(matches!(err, DescriptionError::DuplicateName { kind: "model", .. }));
    }

    #[test]
    fn joint_to_missing_link_is_rejected() {
        let mut model = box_model("arm");
        model.joints.push(Joint {
            name: "hinge".to_string(),
            parent: WORLD_FRAME.to_string(),
            child: "forearm".to_string(),
            pose: Pose::identity(),
            kind: JointKind::Fixed,
        });
        match model.validate() {
            Err(DescriptionError::UnknownLink { link, .. }) => assert_eq!(link, "forearm"),
            other => panic!("expected UnknownLink, got {other:?}"),
        }
    }

    #[test]
    fn non_positive_mass_is_rejected() {
        let mut model = box_model("box");
        model.links[0].inertial.as_mut().unwrap().mass = 0.0;
        assert!(matches!(
            model.validate(),
            Err(DescriptionError::InvalidValue { field: "mass", .. })
        ));
    }

    #[test]
    fn bad_inertia_is_rejected() {
        let mut model = box_model("box");
        let inertial = model.links[0].inertial.as_mut().unwrap();
        inertial.inertia = Some(Vec3::new(0.1, -0.2, 0.1));
        assert!(matches!(
            model.validate(),
            Err(DescriptionError::InvalidValue { field: "inertia", .. })
        ));

        model.links[0].inertial.as_mut().unwrap().inertia = Some(Vec3::new(f64::NAN, 0.1, 0.1));
        assert!(model.validate().is_err());

        model.links[0].inertial.as_mut().unwrap().inertia = Some(Vec3::new(0.0, 0.1, 0.1));
        assert!(model.validate().is_ok());
    }

    #[test]
    fn serde_tagged_geometry() {
        let geometry = Geometry::Cylinder {
            radius: 0.1,
            length: 0.5,
        };
        let json = serde_json::to_string(&geometry).unwrap();
        assert!(json.contains(r#""type":"cylinder""#));

        let restored: Geometry = serde_json::from_str(&json).unwrap();
        assert_eq!(geometry, restored);
    }
}
