use nalgebra::{Matrix3, Point3, Rotation3, Unit, Vector3};
use thiserror::Error;

const AXIS_LENGTH_EPSILON: f64 = 1e-9;

#[derive(Debug, Error, PartialEq)]
pub enum GeometryError {
    #[error("Superposition requires at least {required} paired points, got {found}")]
    TooFewPoints { required: usize, found: usize },
    #[error("Point sets have mismatched lengths ({0} vs {1})")]
    LengthMismatch(usize, usize),
    #[error("Rotation axis has zero length")]
    DegenerateAxis,
}

/// A rigid-body transform (rotation + translation, no scaling or shear)
/// mapping one point set onto another.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidTransform {
    pub rotation: Rotation3<f64>,
    pub translation: Vector3<f64>,
}

impl RigidTransform {
    pub fn identity() -> Self {
        Self {
            rotation: Rotation3::identity(),
            translation: Vector3::zeros(),
        }
    }

    pub fn apply(&self, point: &Point3<f64>) -> Point3<f64> {
        self.rotation * point + self.translation
    }
}

/// Computes the least-squares rigid superposition of `mobile` onto `target`
/// (Kabsch): SVD of the cross-covariance of the two centered point sets,
/// with a determinant correction to exclude reflections.
pub fn superposition(
    mobile: &[Point3<f64>],
    target: &[Point3<f64>],
) -> Result<RigidTransform, GeometryError> {
    if mobile.len() != target.len() {
        return Err(GeometryError::LengthMismatch(mobile.len(), target.len()));
    }
    if mobile.len() < 2 {
        return Err(GeometryError::TooFewPoints {
            required: 2,
            found: mobile.len(),
        });
    }

    let mobile_centroid = centroid(mobile);
    let target_centroid = centroid(target);

    let h = mobile
        .iter()
        .zip(target.iter())
        .fold(Matrix3::zeros(), |acc, (m, t)| {
            acc + (t - target_centroid) * (m - mobile_centroid).transpose()
        });

    let svd = h.svd(true, true);
    let u = svd.u.expect("SVD of a 3x3 matrix always yields U");
    let v_t = svd.v_t.expect("SVD of a 3x3 matrix always yields V^T");

    let d = (u * v_t.transpose()).determinant();
    let mut correction = Matrix3::identity();
    if d < 0.0 {
        correction[(2, 2)] = -1.0;
    }

    // U·diag(1,1,d)·Vᵀ is already a proper rotation; iterative refinement
    // would stall at the identity for the symmetric 180° case.
    let rotation = Rotation3::from_matrix_unchecked(u * correction * v_t);
    let translation = target_centroid.coords - rotation * mobile_centroid.coords;

    Ok(RigidTransform {
        rotation,
        translation,
    })
}

pub fn centroid(points: &[Point3<f64>]) -> Point3<f64> {
    let sum: Vector3<f64> = points.iter().map(|p| p.coords).sum();
    Point3::from(sum / points.len() as f64)
}

/// Rotates `point` by `angle` radians about the line through `pivot` with
/// direction `axis` (axis-angle/Rodrigues rotation). The pivot itself is a
/// fixed point of the rotation.
pub fn rotate_about_line(
    point: &Point3<f64>,
    pivot: &Point3<f64>,
    axis: &Unit<Vector3<f64>>,
    angle: f64,
) -> Point3<f64> {
    let rotation = Rotation3::from_axis_angle(axis, angle);
    pivot + rotation * (point - pivot)
}

/// Normalizes an axis vector, failing on (near-)zero length.
pub fn normalized_axis(axis: Vector3<f64>) -> Result<Unit<Vector3<f64>>, GeometryError> {
    Unit::try_new(axis, AXIS_LENGTH_EPSILON).ok_or(GeometryError::DegenerateAxis)
}

/// The angle at `b` of the triple a-b-c, in radians.
pub fn angle(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> f64 {
    let ba = (a - b).normalize();
    let bc = (c - b).normalize();
    ba.dot(&bc).clamp(-1.0, 1.0).acos()
}

/// The signed dihedral of the quadruple a-b-c-d about the b-c axis, in
/// radians.
pub fn dihedral(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>, d: &Point3<f64>) -> f64 {
    let b1 = b - a;
    let b2 = c - b;
    let b3 = d - c;
    let n1 = b1.cross(&b2);
    let n2 = b2.cross(&b3);
    let m1 = n1.cross(&b2.normalize());
    m1.dot(&n2).atan2(n1.dot(&n2))
}

/// Places a fourth atom from three reference positions and internal
/// coordinates: the c-d bond length, the b-c-d angle, and the a-b-c-d
/// dihedral (angles in radians).
pub fn place_from_internal_coords(
    a: &Point3<f64>,
    b: &Point3<f64>,
    c: &Point3<f64>,
    bond_length: f64,
    bond_angle: f64,
    dihedral_angle: f64,
) -> Result<Point3<f64>, GeometryError> {
    let bc = normalized_axis(c - b)?;
    let ab = b - a;
    let n = normalized_axis(ab.cross(&bc))?;
    let m = bc.cross(&n);

    // Spherical construction in the local (bc, m, n) frame; the sign of the
    // in-plane components matches the convention of `dihedral`.
    let d_local = Vector3::new(
        -bond_length * bond_angle.cos(),
        -bond_length * bond_angle.sin() * dihedral_angle.cos(),
        -bond_length * bond_angle.sin() * dihedral_angle.sin(),
    );

    Ok(c + bc.into_inner() * d_local.x + m * d_local.y + n.into_inner() * d_local.z)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn superposition_recovers_a_pure_translation() {
        let mobile = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let shift = Vector3::new(3.0, -2.0, 5.0);
        let target: Vec<_> = mobile.iter().map(|p| p + shift).collect();

        let transform = superposition(&mobile, &target).unwrap();
        for (m, t) in mobile.iter().zip(target.iter()) {
            assert_relative_eq!(transform.apply(m), *t, epsilon = 1e-10);
        }
    }

    #[test]
    fn superposition_recovers_a_rotation_plus_translation() {
        let mobile = vec![
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(1.0, 1.0, 1.0),
        ];
        let rotation = Rotation3::from_axis_angle(&Vector3::z_axis(), FRAC_PI_2);
        let shift = Vector3::new(-1.0, 2.0, 0.5);
        let target: Vec<_> = mobile.iter().map(|p| rotation * p + shift).collect();

        let transform = superposition(&mobile, &target).unwrap();
        for (m, t) in mobile.iter().zip(target.iter()) {
            assert_relative_eq!(transform.apply(m), *t, epsilon = 1e-9);
        }
    }

    #[test]
    fn superposition_of_two_point_pairs_aligns_both() {
        // The stitcher's landmark case: exactly two paired points.
        let mobile = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.5, 0.0, 0.0)];
        let target = vec![Point3::new(4.0, 4.0, 4.0), Point3::new(4.0, 5.5, 4.0)];

        let transform = superposition(&mobile, &target).unwrap();
        assert_relative_eq!(transform.apply(&mobile[0]), target[0], epsilon = 1e-9);
        assert_relative_eq!(transform.apply(&mobile[1]), target[1], epsilon = 1e-9);
    }

    #[test]
    fn superposition_of_antiparallel_point_pairs_is_a_half_turn() {
        // One segment pointing +x must map onto one pointing -x; the optimal
        // rotation is a full 180 degrees, not the identity.
        let mobile = vec![Point3::new(11.2, 0.0, 0.0), Point3::new(12.4, 0.0, 0.0)];
        let target = vec![Point3::new(2.4, 0.0, 0.0), Point3::new(1.2, 0.0, 0.0)];

        let transform = superposition(&mobile, &target).unwrap();
        assert_relative_eq!(transform.apply(&mobile[0]), target[0], epsilon = 1e-9);
        assert_relative_eq!(transform.apply(&mobile[1]), target[1], epsilon = 1e-9);
    }

    #[test]
    fn superposition_validates_its_inputs() {
        let one = vec![Point3::origin()];
        let two = vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0)];
        assert_eq!(
            superposition(&one, &two),
            Err(GeometryError::LengthMismatch(1, 2))
        );
        assert_eq!(
            superposition(&one, &one),
            Err(GeometryError::TooFewPoints {
                required: 2,
                found: 1
            })
        );
    }

    #[test]
    fn rotate_about_line_keeps_the_pivot_fixed() {
        let pivot = Point3::new(1.0, 2.0, 3.0);
        let axis = Vector3::y_axis();
        for angle in [0.3, PI, -2.1] {
            assert_relative_eq!(
                rotate_about_line(&pivot, &pivot, &axis, angle),
                pivot,
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn rotate_about_line_quarter_turn() {
        let pivot = Point3::new(0.0, 0.0, 1.0);
        let point = Point3::new(1.0, 0.0, 1.0);
        let rotated = rotate_about_line(&point, &pivot, &Vector3::z_axis(), FRAC_PI_2);
        assert_relative_eq!(rotated, Point3::new(0.0, 1.0, 1.0), epsilon = 1e-12);
    }

    #[test]
    fn normalized_axis_rejects_zero_vectors() {
        assert_eq!(
            normalized_axis(Vector3::zeros()),
            Err(GeometryError::DegenerateAxis)
        );
        assert!(normalized_axis(Vector3::new(0.0, 0.0, 1e-3)).is_ok());
    }

    #[test]
    fn angle_of_a_right_triangle_corner() {
        let a = Point3::new(1.0, 0.0, 0.0);
        let b = Point3::origin();
        let c = Point3::new(0.0, 1.0, 0.0);
        assert_abs_diff_eq!(angle(&a, &b, &c), FRAC_PI_2, epsilon = 1e-12);
    }

    #[test]
    fn dihedral_of_planar_and_perpendicular_quadruples() {
        let a = Point3::new(0.0, 1.0, 0.0);
        let b = Point3::origin();
        let c = Point3::new(1.0, 0.0, 0.0);
        let d_trans = Point3::new(1.0, -1.0, 0.0);
        let d_perp = Point3::new(1.0, 0.0, 1.0);

        assert_abs_diff_eq!(dihedral(&a, &b, &c, &d_trans).abs(), PI, epsilon = 1e-12);
        assert_abs_diff_eq!(
            dihedral(&a, &b, &c, &d_perp).abs(),
            FRAC_PI_2,
            epsilon = 1e-12
        );
    }

    #[test]
    fn internal_coordinate_placement_reproduces_the_measured_values() {
        let a = Point3::new(-1.2, 0.4, 0.3);
        let b = Point3::new(0.1, -0.2, 0.0);
        let c = Point3::new(1.4, 0.5, -0.1);
        let bond_length = 1.52;
        let bond_angle = 109.5f64.to_radians();
        let dihedral_angle = 60.0f64.to_radians();

        let d = place_from_internal_coords(&a, &b, &c, bond_length, bond_angle, dihedral_angle)
            .unwrap();

        assert_abs_diff_eq!((d - c).norm(), bond_length, epsilon = 1e-9);
        assert_abs_diff_eq!(angle(&b, &c, &d), bond_angle, epsilon = 1e-9);
        assert_abs_diff_eq!(dihedral(&a, &b, &c, &d), dihedral_angle, epsilon = 1e-9);
    }

    #[test]
    fn internal_coordinate_placement_fails_on_collinear_references() {
        let a = Point3::origin();
        let b = Point3::new(1.0, 0.0, 0.0);
        let c = Point3::new(2.0, 0.0, 0.0);
        assert_eq!(
            place_from_internal_coords(&a, &b, &c, 1.5, 1.9, 0.0),
            Err(GeometryError::DegenerateAxis)
        );
    }
}
