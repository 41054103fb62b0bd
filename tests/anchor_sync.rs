// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 Geoanchor Contributors

//! Globe anchor synchronization scenarios

use anyhow::Result;
use approx::assert_relative_eq;
use geoanchor::utils::math::translation;
use geoanchor::{AnchorState, Ellipsoid, Scene};
use nalgebra::{Matrix4, Vector3};

fn equator_ecef() -> Vector3<f64> {
    // ECEF of (lon 0, lat 0, h 0) on WGS84.
    Vector3::new(6378137.0, 0.0, 0.0)
}

#[test]
fn test_resolve_is_idempotent() -> Result<()> {
    let mut scene = Scene::new();
    let entity = scene.spawn_entity(Matrix4::identity());
    let anchor = scene.attach_anchor(entity)?;

    let first = scene.resolve_parent_frame(anchor)?.expect("resolved");
    let second = scene.resolve_parent_frame(anchor)?.expect("resolved");
    assert_eq!(first, second, "second resolve must return the cached frame");

    // One subscription, not two.
    let geo = scene.frames().georeference(first.georeference).unwrap();
    assert_eq!(geo.subscribers(), vec![anchor]);
    Ok(())
}

#[test]
fn test_move_on_unresolved_anchor_is_a_no_op() -> Result<()> {
    let mut scene = Scene::new();
    let entity = scene.spawn_entity(Matrix4::identity());
    let anchor = scene.attach_anchor(entity)?;

    scene.move_anchor_to_ecef(anchor, equator_ecef())?;

    let state = scene.anchor(anchor).unwrap().state();
    assert_eq!(state, AnchorState::Unresolved);
    assert!(!scene.anchor(anchor).unwrap().is_globe_transform_valid());
    assert_eq!(scene.anchor_ecef(anchor)?, Vector3::zeros());
    assert_eq!(scene.entity(entity).unwrap().transform(), &Matrix4::identity());
    Ok(())
}

#[test]
fn test_local_transform_change_computes_globe_transform() -> Result<()> {
    let mut scene = Scene::new();
    let entity = scene.spawn_entity(Matrix4::identity());
    let anchor = scene.attach_anchor(entity)?;
    scene.resolve_parent_frame(anchor)?;
    assert_eq!(scene.anchor(anchor).unwrap().state(), AnchorState::Invalid);

    // Entity sits at the frame origin; the event promotes the anchor to
    // Valid with the origin's ECEF as its globe position.
    scene.set_entity_transform(entity, Matrix4::identity(), false)?;

    let a = scene.anchor(anchor).unwrap();
    assert_eq!(a.state(), AnchorState::Valid);
    let ecef = a.get_ecef();
    assert_relative_eq!(ecef.x, equator_ecef().x, epsilon = 1e-6);
    assert_relative_eq!(ecef.y, 0.0, epsilon = 1e-6);
    assert_relative_eq!(ecef.z, 0.0, epsilon = 1e-6);
    Ok(())
}

#[test]
fn test_local_change_does_not_write_back() -> Result<()> {
    let mut scene = Scene::new();
    let entity = scene.spawn_entity(Matrix4::identity());
    let anchor = scene.attach_anchor(entity)?;
    scene.register_anchor(anchor)?;

    let moved = Matrix4::new_translation(&Vector3::new(12.0, -7.0, 3.0));
    scene.set_entity_transform(entity, moved, false)?;

    // The event path must leave the externally-written local transform
    // exactly as written.
    assert_eq!(scene.entity(entity).unwrap().transform(), &moved);
    assert_eq!(scene.anchor(anchor).unwrap().state(), AnchorState::Valid);
    Ok(())
}

#[test]
fn test_mirror_groups_consistent_after_moves() -> Result<()> {
    let ellipsoid = Ellipsoid::wgs84();
    let mut scene = Scene::new();
    let entity = scene.spawn_entity(Matrix4::identity());
    let anchor = scene.attach_anchor(entity)?;
    scene.register_anchor(anchor)?;

    // Rome, via the cartographic entry point.
    scene.move_anchor_to_longitude_latitude_height(
        anchor,
        Vector3::new(12.4923, 41.8902, 50.0),
    )?;
    let llh = scene.anchor_longitude_latitude_height(anchor)?;
    let ecef = scene.anchor_ecef(anchor)?;
    let expected = ellipsoid.llh_to_ecef(&llh);
    assert_relative_eq!((expected - ecef).norm(), 0.0, epsilon = 1e-3);

    // Somewhere over the Pacific, via the cartesian entry point.
    scene.move_anchor_to_ecef(anchor, Vector3::new(-2500000.0, -4500000.0, 3000000.0))?;
    let llh = scene.anchor_longitude_latitude_height(anchor)?;
    let ecef = scene.anchor_ecef(anchor)?;
    let expected = ellipsoid.llh_to_ecef(&llh);
    assert_relative_eq!((expected - ecef).norm(), 0.0, epsilon = 1e-3);
    Ok(())
}

#[test]
fn test_move_writes_local_transform_with_teleport_hint() -> Result<()> {
    let mut scene = Scene::new();
    let entity = scene.spawn_entity(Matrix4::identity());
    let anchor = scene.attach_anchor(entity)?;
    scene.register_anchor(anchor)?;

    // 100m above the frame origin: the ENU write-back puts the entity
    // 100m up the local Z axis.
    scene.move_anchor_to_longitude_latitude_height(anchor, Vector3::new(0.0, 0.0, 100.0))?;

    let stored = scene.entity(entity).unwrap();
    let local = translation(stored.transform());
    assert_relative_eq!(local.x, 0.0, epsilon = 1e-6);
    assert_relative_eq!(local.y, 0.0, epsilon = 1e-6);
    assert_relative_eq!(local.z, 100.0, epsilon = 1e-6);
    assert_eq!(stored.last_write_teleported(), Some(true));
    Ok(())
}

#[test]
fn test_georeference_change_keeps_globe_transform() -> Result<()> {
    let mut scene = Scene::new();
    let entity = scene.spawn_entity(Matrix4::identity());
    let anchor = scene.attach_anchor(entity)?;
    scene.register_anchor(anchor)?;

    let frame = scene.anchor(anchor).unwrap().resolved_frame().unwrap().georeference;
    let globe_before = *scene.anchor(anchor).unwrap().globe_transform();

    // Move the origin ~111m east (0.001 deg of longitude at the equator).
    scene.set_georeference_origin(frame, Vector3::new(0.001, 0.0, 0.0))?;

    let a = scene.anchor(anchor).unwrap();
    assert_eq!(a.globe_transform(), &globe_before, "globe position did not move");

    // The entity is now ~111.32m west of the new origin along the east
    // axis.
    let local = translation(scene.entity(entity).unwrap().transform());
    assert_relative_eq!(local.x, -111.3195, epsilon = 1e-2);
    assert_relative_eq!(local.y, 0.0, epsilon = 1e-3);
    Ok(())
}

#[test]
fn test_origin_rebase_recomputes_local_only() -> Result<()> {
    let mut scene = Scene::new();
    let entity = scene.spawn_entity(Matrix4::identity());
    let anchor = scene.attach_anchor(entity)?;
    scene.register_anchor(anchor)?;

    let globe_before = *scene.anchor(anchor).unwrap().globe_transform();
    let delta = Vector3::new(1000.0, 0.0, 0.0);
    scene.apply_world_offset(delta)?;

    // newOrigin = oldOrigin - delta
    assert_eq!(scene.world_origin(), Vector3::new(-1000.0, 0.0, 0.0));
    assert_eq!(scene.anchor(anchor).unwrap().globe_transform(), &globe_before);

    // Relative position shifts by exactly +delta, recomputed from the
    // globe transform rather than accumulated from the imprecise shift.
    let local = translation(scene.entity(entity).unwrap().transform());
    assert_relative_eq!(local.x, 1000.0, epsilon = 1e-6);
    assert_relative_eq!(local.y, 0.0, epsilon = 1e-6);
    assert_relative_eq!(local.z, 0.0, epsilon = 1e-6);
    Ok(())
}

#[test]
fn test_latitude_edit_backfills_then_wins() -> Result<()> {
    let mut scene = Scene::new();
    let entity = scene.spawn_entity(Matrix4::new_translation(&Vector3::new(
        1000.0, 2000.0, 37.0,
    )));
    let anchor = scene.attach_anchor(entity)?;
    scene.resolve_parent_frame(anchor)?;
    assert_eq!(scene.anchor(anchor).unwrap().state(), AnchorState::Invalid);

    scene.set_anchor_latitude(anchor, 10.0)?;

    let a = scene.anchor(anchor).unwrap();
    assert_eq!(a.state(), AnchorState::Valid);
    // The edited latitude won over the value derived during backfill; the
    // other two fields kept their prior (default) values.
    let llh = a.get_longitude_latitude_height();
    assert_relative_eq!(llh.x, 0.0, epsilon = 1e-9);
    assert_relative_eq!(llh.y, 10.0, epsilon = 1e-9);
    assert_relative_eq!(llh.z, 0.0, epsilon = 1e-9);

    // And the globe transform translation was rebuilt from the full
    // triple.
    let expected = Ellipsoid::wgs84().llh_to_ecef(&Vector3::new(0.0, 10.0, 0.0));
    assert_relative_eq!((a.get_ecef() - expected).norm(), 0.0, epsilon = 1e-6);
    Ok(())
}

#[test]
fn test_queries_on_unresolved_anchor_return_zero() -> Result<()> {
    let mut scene = Scene::new();
    let entity = scene.spawn_entity(Matrix4::identity());
    let anchor = scene.attach_anchor(entity)?;

    assert_eq!(scene.anchor_ecef(anchor)?, Vector3::zeros());
    assert_eq!(
        scene.anchor_longitude_latitude_height(anchor)?,
        Vector3::zeros()
    );
    Ok(())
}

#[test]
fn test_tileset_parent_follows_body() -> Result<()> {
    let mut scene = Scene::new();
    let geo = scene.add_georeference(Ellipsoid::wgs84(), Vector3::zeros());
    let tileset = scene.add_tileset("World", geo);

    let entity = scene.spawn_entity(Matrix4::identity());
    let anchor = scene.attach_anchor(entity)?;
    scene.register_anchor(anchor)?;

    // Tag search found the tileset.
    let frame = *scene.anchor(anchor).unwrap().resolved_frame().unwrap();
    assert_eq!(frame.tileset, Some(tileset));
    assert_eq!(frame.georeference, geo);

    let globe_before = *scene.anchor(anchor).unwrap().globe_transform();

    // Move the tileset body; the entity follows, the globe position does
    // not.
    let shift = Matrix4::new_translation(&Vector3::new(500.0, 0.0, 0.0));
    scene.set_tileset_transform(tileset, shift)?;

    assert_eq!(scene.anchor(anchor).unwrap().globe_transform(), &globe_before);
    let local = translation(scene.entity(entity).unwrap().transform());
    assert_relative_eq!(local.x, 500.0, epsilon = 1e-6);
    Ok(())
}

#[test]
fn test_tag_change_rebinds_unless_explicit() -> Result<()> {
    let mut scene = Scene::new();
    let geo = scene.add_georeference(Ellipsoid::wgs84(), Vector3::zeros());
    let world = scene.add_tileset("World", geo);
    let moon = scene.add_tileset("Moon", geo);

    let entity = scene.spawn_entity(Matrix4::identity());
    let anchor = scene.attach_anchor(entity)?;
    scene.register_anchor(anchor)?;
    assert_eq!(
        scene.anchor(anchor).unwrap().resolved_frame().unwrap().tileset,
        Some(world)
    );

    // Tag-based resolution follows the tag edit.
    scene.set_anchor_parent_tag(anchor, "Moon")?;
    assert_eq!(
        scene.anchor(anchor).unwrap().resolved_frame().unwrap().tileset,
        Some(moon)
    );

    // An explicit reference pins the resolution; tag edits no longer
    // rebind.
    scene.set_anchor_parent_tileset(anchor, Some(world))?;
    scene.set_anchor_parent_tag(anchor, "Mars")?;
    assert_eq!(
        scene.anchor(anchor).unwrap().resolved_frame().unwrap().tileset,
        Some(world)
    );
    Ok(())
}

#[test]
fn test_invalidate_unsubscribes() -> Result<()> {
    let mut scene = Scene::new();
    let entity = scene.spawn_entity(Matrix4::identity());
    let anchor = scene.attach_anchor(entity)?;
    scene.register_anchor(anchor)?;

    let frame = scene.anchor(anchor).unwrap().resolved_frame().unwrap().georeference;
    assert!(scene.frames().georeference(frame).unwrap().is_subscribed(anchor));

    scene.invalidate_parent_frame(anchor)?;
    assert!(scene.anchor(anchor).unwrap().resolved_frame().is_none());
    assert!(!scene.frames().georeference(frame).unwrap().is_subscribed(anchor));
    Ok(())
}
