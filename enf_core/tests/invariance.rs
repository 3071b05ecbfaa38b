//! Property tests for the group action and the invariants.
//!
//! Every SE(2)-invariant kind must return the same features after the input
//! and the latent are moved by the same rigid motion.

use enf_core::prelude::*;
use proptest::prelude::*;

fn pose() -> impl Strategy<Value = Pose2> {
    (-2.0f32..2.0, -2.0f32..2.0, 0.0f32..std::f32::consts::TAU)
        .prop_map(|(x, y, a)| Pose2::from_parts(x, y, a))
}

fn motion() -> impl Strategy<Value = Se2> {
    (0.0f32..std::f32::consts::TAU, -3.0f32..3.0, -3.0f32..3.0)
        .prop_map(|(a, tx, ty)| Se2::new(a, Point2::new(tx, ty)))
}

fn eval(kind: InvariantKind, x: Pose2, p: Pose2) -> Vec<f32> {
    let dims = kind.dims();
    let xe = x.to_embedding();
    let pe = p.to_embedding();
    let mut out = vec![0.0; dims.dim];
    kind.evaluate(
        &xe[..dims.x_embedding_dim()],
        &pe[..dims.z_embedding_dim()],
        &mut out,
    )
    .unwrap();
    out
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn se2_invariants_are_invariant(x in pose(), p in pose(), g in motion()) {
        for kind in [
            InvariantKind::PonitaPos2d,
            InvariantKind::Ponita2d,
            InvariantKind::NormRelativePosition(2),
        ] {
            let before = eval(kind, x, p);
            let after = eval(kind, g.act_pose(x), g.act_pose(p));
            for (a, b) in before.iter().zip(&after) {
                prop_assert!((a - b).abs() < 1e-4, "{:?}: {:?} vs {:?}", kind, before, after);
            }
        }
    }

    #[test]
    fn relative_position_is_translation_invariant(x in pose(), p in pose(), tx in -3.0f32..3.0, ty in -3.0f32..3.0) {
        let g = Se2::new(0.0, Point2::new(tx, ty));
        let kind = InvariantKind::RelativePosition(2);
        let before = eval(kind, x, p);
        let after = eval(kind, g.act_pose(x), g.act_pose(p));
        for (a, b) in before.iter().zip(&after) {
            prop_assert!((a - b).abs() < 1e-4);
        }
    }

    #[test]
    fn inverse_composes_to_identity(g in motion(), x in pose()) {
        let back = g.inverse().act_pose(g.act_pose(x));
        prop_assert!((back.position - x.position).length() < 1e-4);
        prop_assert!((back.orientation.cos() - x.orientation.cos()).abs() < 1e-4);
        prop_assert!((back.orientation.sin() - x.orientation.sin()).abs() < 1e-4);
    }

    #[test]
    fn ponita_position_preserves_distance(x in pose(), p in pose()) {
        let [a, b] = ponita_pos_2d(x.position, p);
        let d = (x.position - p.position).length();
        prop_assert!(((a * a + b * b).sqrt() - d).abs() < 1e-4);
    }
}
