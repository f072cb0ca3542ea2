use approx::assert_relative_eq;

use homebuilder_core::geometry::Point;
use homebuilder_core::World;
use homebuilder_io::{Journal, JournalReader, JournalWriter};

fn p(x: f64, z: f64) -> Point {
    Point::new(x, 0.0, z)
}

/// A small house: a closed room, a split, a drag, a second storey and an
/// undone edit that was later overwritten.
fn edited_world() -> World {
    let mut world = World::new("house");
    let corners = [p(0.0, 0.0), p(6.0, 0.0), p(6.0, 4.0), p(0.0, 4.0)];
    let mut room = Vec::new();
    for i in 0..corners.len() {
        room.push(world.create_wall(corners[i], corners[(i + 1) % corners.len()]).unwrap());
    }
    let half = world.split_wall(room[0], p(3.0, 0.0)).unwrap();
    world.create_wall(p(3.0, 0.0), p(3.0, 4.0)).unwrap();

    let t = world.begin("Drag wall").unwrap();
    for step in 1..=3 {
        let x = 6.0 + f64::from(step) * 0.25;
        let command = world.move_command(half, p(3.0, 0.0), p(x, 0.0)).unwrap();
        world.add(command).unwrap();
    }
    world.commit(t).unwrap();

    let scratch = world.create_wall(p(10.0, 10.0), p(12.0, 10.0)).unwrap();
    world.destroy_wall(scratch).unwrap();

    world.create_wall(p(-5.0, -5.0), p(-5.0, 5.0)).unwrap();
    world.undo().unwrap();

    let upper = world.create_level(2.7).unwrap();
    world.set_active_level(upper).unwrap();
    world.create_wall(p(0.0, 0.0), p(6.0, 0.0)).unwrap();
    world.flush();
    world
}

#[test]
fn replay_reproduces_every_wall() {
    let world = edited_world();
    let journal = Journal::from_world(&world);

    let mut writer = JournalWriter::new(Vec::new()).pretty(true);
    writer.write(&journal).unwrap();
    let bytes = writer.into_inner();
    let loaded = JournalReader::new(bytes.as_slice()).read().unwrap();
    let replayed = loaded.replay().unwrap();

    assert_eq!(replayed.id, world.id);
    assert_eq!(replayed.summaries(), world.summaries());
    assert_eq!(replayed.plan().level_count(), 2);
    for wall in world.walls() {
        let copy = replayed.wall(wall.id()).unwrap();
        assert_eq!(copy.footprint(), wall.footprint());
        assert_relative_eq!(copy.length(), wall.length());
    }
}

#[test]
fn replayed_world_keeps_editing_with_fresh_ids() {
    let world = edited_world();
    let mut replayed = Journal::from_world(&world).replay().unwrap();
    let upper = world.active_level();
    replayed.set_active_level(upper).unwrap();
    let highest = world.walls().map(|w| w.id()).max().unwrap();

    let id = replayed.create_wall(p(20.0, 0.0), p(24.0, 0.0)).unwrap();
    assert!(id > highest);

    // the replayed log undoes like the original one
    replayed.undo().unwrap();
    replayed.undo().unwrap();
    assert_eq!(replayed.plan().walls_on(upper).count(), 0);
}

#[test]
fn drag_is_journaled_as_a_single_move() {
    let journal = Journal::from_world(&edited_world());
    let drag = journal
        .transactions
        .iter()
        .find(|t| t.name == "Drag wall")
        .unwrap();
    assert_eq!(drag.commands.len(), 1);
    assert!(journal.transactions.iter().all(|t| !t.commands.is_empty()));
}
