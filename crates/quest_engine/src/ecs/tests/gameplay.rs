//! World scenarios with the built-in gameplay systems registered

use std::cell::RefCell;
use std::rc::Rc;

use crate::core::config::WorldConfig;
use crate::ecs::components::{Health, Movement, Transform};
use crate::ecs::systems::{CleanupSystem, CombatSystem, MovementSystem};
use crate::ecs::{EntityId, IdentityOverride, PrefabLibrary, SceneDocument, World};
use crate::events::{EventKind, GameEvent};
use crate::pathfinding::{GridPos, PathingFlags};

const PREFABS: &str = r#"[
    {
        "name": "Hero",
        "components": {
            "Transform": { "x": "0", "y": "0" },
            "Identifiable": { "id": "1", "kind": "warrior", "name": "Hero" },
            "Movement": { "speed": "2" },
            "Health": { "hp": "20", "max_hp": "20" },
            "Collidable": {}
        }
    },
    {
        "name": "Rat",
        "components": {
            "Transform": {},
            "Identifiable": { "kind": "rat" },
            "Health": { "hp": "4", "max_hp": "4" },
            "Collidable": {}
        }
    }
]"#;

const SCENE: &str = r#"{
    "name": "corridor",
    "root": {
        "name": "Corridor",
        "children": [
            { "ref": "Hero", "tag": "player" },
            { "ref": "Rat", "components": { "Transform": { "x": "2", "y": "0" } } }
        ]
    }
}"#;

struct Game {
    world: World,
    events: Rc<RefCell<Vec<GameEvent>>>,
    hero: EntityId,
    rat: EntityId,
}

fn boot() -> Game {
    crate::foundation::logging::init_for_tests();
    let mut world = World::new(WorldConfig::default()).unwrap();
    world.register_system::<MovementSystem>().unwrap();
    world.register_system::<CombatSystem>().unwrap();
    world.register_system::<CleanupSystem>().unwrap();
    world.set_prefabs(PrefabLibrary::from_json(PREFABS).unwrap());
    // Corridor three rows high with a wall in the middle row
    world.set_collision_map(&[vec![0, 0, 0, 0], vec![0, 1, 1, 0], vec![0, 0, 0, 0]]);

    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    world.subscribe(move |event| sink.borrow_mut().push(event.clone()));

    world.load_scene(&SceneDocument::from_json(SCENE).unwrap()).unwrap();
    world.awake().unwrap();
    world.start().unwrap();

    let hero = world.entities().get_entity_with_tag("player").unwrap().id();
    let rat = world.entities().get_entity_with_name("Rat").unwrap().id();
    Game {
        world,
        events,
        hero,
        rat,
    }
}

impl Game {
    fn walk_to(&mut self, target: GridPos) {
        self.world
            .entities_mut()
            .get_component_mut::<Movement>(self.hero)
            .unwrap()
            .go_to(target);
    }

    fn hero_cell(&self) -> Option<GridPos> {
        self.world.entities().get_component::<Transform>(self.hero)?.cell()
    }

    fn kinds(&self) -> Vec<EventKind> {
        self.events.borrow().iter().map(GameEvent::kind).collect()
    }
}

#[test]
fn test_systems_are_ordered_by_tier() {
    let game = boot();
    assert_eq!(
        game.world.system_names(),
        vec!["CombatSystem", "MovementSystem", "CleanupSystem"]
    );
}

#[test]
fn test_start_marks_occupied_cells() {
    let game = boot();
    let pathfinder = game.world.pathfinder();
    assert!(pathfinder.has(0, 0, PathingFlags::COLLIDABLES));
    assert!(pathfinder.has(2, 0, PathingFlags::COLLIDABLES));
    assert!(!pathfinder.has(1, 0, PathingFlags::COLLIDABLES));
}

#[test]
fn test_hero_walks_around_the_rat() {
    let mut game = boot();
    game.walk_to(GridPos::new(3, 0));
    for _ in 0..10 {
        game.world.update(0.5).unwrap();
    }

    assert_eq!(game.hero_cell(), Some(GridPos::new(3, 0)));
    let steps: Vec<GridPos> = game
        .events
        .borrow()
        .iter()
        .filter_map(|event| match event {
            GameEvent::EntityMoved { to, .. } => Some(*to),
            _ => None,
        })
        .collect();
    assert!(!steps.contains(&GridPos::new(2, 0)));
    assert_eq!(steps.last(), Some(&GridPos::new(3, 0)));
    assert!(!game.world.pathfinder().has(0, 0, PathingFlags::COLLIDABLES));
    assert!(game.world.pathfinder().has(3, 0, PathingFlags::COLLIDABLES));
}

#[test]
fn test_killing_the_rat_frees_its_cell_at_end_of_frame() {
    let mut game = boot();
    game.world.broadcast(GameEvent::damage(game.rat, 10.0));

    // Dead but still present until the cleanup runs
    assert!(game.world.entities().contains(game.rat));
    assert_eq!(
        game.world.entities().get_component::<Health>(game.rat).unwrap().hp,
        0.0
    );
    assert!(game.kinds().ends_with(&[EventKind::Death, EventKind::Damage]));

    game.world.update(0.1).unwrap();
    assert!(!game.world.entities().contains(game.rat));
    assert!(!game.world.pathfinder().has(2, 0, PathingFlags::COLLIDABLES));
    game.world.entities().validate().unwrap();

    // With the rat gone the straight corridor is free
    game.events.borrow_mut().clear();
    game.walk_to(GridPos::new(3, 0));
    game.world.update(1.5).unwrap();
    assert_eq!(game.hero_cell(), Some(GridPos::new(3, 0)));
    assert_eq!(game.kinds(), vec![EventKind::EntityMoved; 3]);
}

#[test]
fn test_unreachable_target_reports_path_failure() {
    let mut game = boot();
    game.walk_to(GridPos::new(1, 1));
    game.world.update(0.1).unwrap();

    assert_eq!(
        *game.events.borrow().last().unwrap(),
        GameEvent::path_failed(game.hero, GridPos::new(1, 1))
    );
    assert!(!game.world.entities().get_component::<Movement>(game.hero).unwrap().moving);
}

#[test]
fn test_server_spawn_and_despawn() {
    let mut game = boot();
    let identity = IdentityOverride {
        kind: Some("rat".into()),
        id: Some(501),
        name: Some("Big Rat".into()),
    };
    let spawned = game.world.spawn("Rat", None, &identity).unwrap();
    assert_eq!(
        game.world.entities().get_entity_with_id(spawned).unwrap().parent(),
        Some(game.world.entities().root())
    );

    game.world.broadcast(GameEvent::despawn(501));
    game.world.update(0.1).unwrap();
    assert!(!game.world.entities().contains(spawned));
    assert!(game.world.entities().contains(game.rat));
}
