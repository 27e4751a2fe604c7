//! Headless cellar session
//!
//! Boots the engine from `config.toml`, loads the cellar scene and plays a
//! short scripted run: the hero walks between rooms, fights the rats and
//! reacts to simulated server spawn and despawn messages.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use quest_engine::foundation::logging;
use quest_engine::prelude::*;
use thiserror::Error;

const SCENE: &str = "scenes/cellar.json";
const MAP: &str = "maps/cellar.json";
const HIT_DAMAGE: f32 = 3.0;

/// Client startup errors
#[derive(Debug, Error)]
enum ClientError {
    #[error("Failed to read map {path}: {source}")]
    MapRead { path: String, source: std::io::Error },

    #[error("Malformed map {path}: {source}")]
    MapParse { path: String, source: serde_json::Error },
}

/// One scripted action of the session
#[derive(Debug, Clone)]
enum Step {
    WalkTo(GridPos),
    Attack(&'static str),
    ServerSpawn {
        server_id: i32,
        kind: &'static str,
        position: GridPos,
    },
    ServerDespawn(i32),
}

#[derive(Debug, Default)]
struct SessionStats {
    steps: u32,
    kills: u32,
    loot: Vec<String>,
    failed_walks: u32,
}

struct CellarSession {
    map: Vec<Vec<u8>>,
    script: VecDeque<Step>,
    current: Option<Step>,
    inbox: Rc<RefCell<Vec<GameEvent>>>,
    player: Option<EntityId>,
    stats: SessionStats,
}

impl CellarSession {
    fn new(map: Vec<Vec<u8>>) -> Self {
        let script = VecDeque::from([
            Step::WalkTo(GridPos::new(6, 0)),
            Step::Attack("Rat"),
            Step::ServerSpawn {
                server_id: 900,
                kind: "Rat",
                position: GridPos::new(0, 5),
            },
            Step::WalkTo(GridPos::new(3, 3)),
            Step::Attack("GiantRat"),
            Step::ServerDespawn(900),
            Step::WalkTo(GridPos::new(6, 4)),
        ]);
        Self {
            map,
            script,
            current: None,
            inbox: Rc::new(RefCell::new(Vec::new())),
            player: None,
            stats: SessionStats::default(),
        }
    }

    /// Handle events the world delivered since the last frame
    fn drain_inbox(&mut self, engine: &mut Engine) -> Result<(), AppError> {
        let events: Vec<GameEvent> = self.inbox.borrow_mut().drain(..).collect();
        for event in events {
            match event {
                GameEvent::ServerSpawn {
                    server_id,
                    kind,
                    position,
                } => {
                    let id = engine
                        .world_mut()
                        .spawn(&kind, None, &IdentityOverride::with_id(server_id))?;
                    if let Some(transform) = engine.world_mut().entities_mut().get_component_mut::<Transform>(id) {
                        transform.set_cell(position);
                    }
                    log::info!("Server spawned {} #{} at {}", kind, server_id, position);
                }
                GameEvent::PathFailed { entity, target } if Some(entity) == self.player => {
                    log::warn!("Hero cannot reach {}, skipping", target);
                    self.stats.failed_walks += 1;
                    self.current = None;
                }
                GameEvent::EntityMoved { entity, .. } if Some(entity) == self.player => {
                    self.stats.steps += 1;
                }
                GameEvent::Death { entity } => {
                    log::info!("{} died", entity);
                    self.stats.kills += 1;
                }
                GameEvent::LootDropped { item, position, .. } => {
                    log::info!("{} dropped at {}", item, position);
                    self.stats.loot.push(item);
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn begin(engine: &mut Engine, player: EntityId, step: &Step) {
        log::info!("Next step: {:?}", step);
        match step {
            Step::WalkTo(target) => {
                if let Some(movement) = engine.world_mut().entities_mut().get_component_mut::<Movement>(player) {
                    movement.go_to(*target);
                }
            }
            Step::Attack(_) => {}
            Step::ServerSpawn {
                server_id,
                kind,
                position,
            } => engine.world_mut().broadcast(GameEvent::spawn(*server_id, *kind, *position)),
            Step::ServerDespawn(server_id) => engine.world_mut().broadcast(GameEvent::despawn(*server_id)),
        }
    }

    /// Advance the running step by one frame, true once it is complete
    fn progress(engine: &mut Engine, player: EntityId, step: &Step) -> bool {
        match step {
            Step::WalkTo(_) => !engine
                .world()
                .entities()
                .get_component::<Movement>(player)
                .is_some_and(|movement| movement.moving),
            Step::Attack(name) => {
                let Some(target) = engine.world().entities().get_entity_with_name(name).map(Entity::id) else {
                    return true;
                };
                let world = engine.world_mut();
                world.broadcast(GameEvent::attack(player, target));
                world.broadcast(GameEvent::damage(target, HIT_DAMAGE));
                false
            }
            Step::ServerSpawn { .. } | Step::ServerDespawn(_) => true,
        }
    }
}

impl Application for CellarSession {
    fn initialize(&mut self, engine: &mut Engine) -> Result<(), AppError> {
        let world = engine.world_mut();
        world.register_system::<MovementSystem>()?;
        world.register_system::<CombatSystem>()?;
        world.register_system::<CleanupSystem>()?;
        world.set_collision_map(&self.map);

        let inbox = Rc::clone(&self.inbox);
        world.subscribe(move |event| {
            log::debug!("Event: {:?}", event);
            inbox.borrow_mut().push(event.clone());
        });

        engine.load_scene(SCENE)?;
        self.player = engine.world().entities().get_entity_with_tag("player").map(Entity::id);
        if self.player.is_none() {
            return Err(AppError::Custom(format!("{SCENE} has no entity tagged 'player'")));
        }
        Ok(())
    }

    fn update(&mut self, engine: &mut Engine, _delta_time: f32) -> Result<(), AppError> {
        self.drain_inbox(engine)?;

        let Some(player) = self.player.filter(|id| engine.world().entities().contains(*id)) else {
            log::warn!("Hero is gone, ending session");
            engine.quit();
            return Ok(());
        };

        if let Some(step) = self.current.clone() {
            if !Self::progress(engine, player, &step) {
                return Ok(());
            }
            self.current = None;
        }

        match self.script.pop_front() {
            Some(step) => {
                Self::begin(engine, player, &step);
                self.current = Some(step);
            }
            None => {
                log::info!("Script finished");
                engine.quit();
            }
        }
        Ok(())
    }

    fn cleanup(&mut self, engine: &mut Engine) {
        log::info!(
            "Session over after {} frames: {} steps, {} kills, {} failed walks, loot {:?}",
            engine.frames(),
            self.stats.steps,
            self.stats.kills,
            self.stats.failed_walks,
            self.stats.loot
        );
    }
}

fn read_map(path: &Path) -> Result<Vec<Vec<u8>>, ClientError> {
    let text = std::fs::read_to_string(path).map_err(|source| ClientError::MapRead {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| ClientError::MapParse {
        path: path.display().to_string(),
        source,
    })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args()
        .nth(1)
        .map_or_else(|| PathBuf::from("config.toml"), PathBuf::from);
    let mut config = EngineConfig::load_or_default(&config_path)?;
    logging::init_with_level(&config.log_level);

    // Asset paths are relative to the config file
    if let Some(dir) = config_path.parent() {
        if Path::new(&config.assets.root).is_relative() {
            config.assets.root = dir.join(&config.assets.root).display().to_string();
        }
    }

    log::info!("Starting quest client with assets from {}", config.assets.root);
    let map = read_map(&Path::new(&config.assets.root).join(MAP))?;
    let mut session = CellarSession::new(map);

    match Engine::run(config, &mut session) {
        Ok(()) => {
            log::info!("Quest client exited cleanly");
            Ok(())
        }
        Err(e) => {
            log::error!("Quest client failed: {}", e);
            Err(e.into())
        }
    }
}
