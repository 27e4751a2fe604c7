//! World orchestrator
//!
//! Owns the entity manager, the pathing grid, the loaded prefabs and the
//! system pool, and drives the lifecycle:
//!
//! ```text
//! Uninitialized --awake()--> Awake --start()--> Started --update()--> Running
//! ```
//!
//! Systems run in ascending order, ties broken by registration order.
//! Events are dispatched synchronously: a hook that raises an event sees it
//! delivered to every system before the next hook runs.

use std::fmt;

use super::component::ComponentRegistry;
use super::entity::EntityId;
use super::error::EcsError;
use super::manager::{EntityManager, IdentityOverride};
use super::prefab::{PrefabLibrary, SceneDocument};
use super::system::{System, SystemContext};
use crate::core::config::WorldConfig;
use crate::events::GameEvent;
use crate::foundation::time::{FrameClock, FrameTime};
use crate::pathfinding::Pathfinder;

/// Lifecycle state of the world
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorldState {
    /// Systems registered but not instantiated
    Uninitialized,
    /// Systems instantiated and their awake hooks run
    Awake,
    /// Start hooks run
    Started,
    /// At least one frame updated
    Running,
}

impl fmt::Display for WorldState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

type SystemFactory = Box<dyn Fn() -> Box<dyn System>>;

/// Registered system waiting to be instantiated
struct Registration {
    name: String,
    order: i32,
    enabled: bool,
    factory: SystemFactory,
}

/// Systems registered with the world before it wakes up
#[derive(Default)]
pub struct SystemPool {
    registrations: Vec<Registration>,
}

impl SystemPool {
    /// Create an empty pool
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a system factory under a unique name
    pub fn register<F>(&mut self, name: &str, order: i32, enabled: bool, factory: F) -> Result<(), EcsError>
    where
        F: Fn() -> Box<dyn System> + 'static,
    {
        if self.contains(name) {
            return Err(EcsError::DuplicateSystem(name.to_string()));
        }
        self.registrations.push(Registration {
            name: name.to_string(),
            order,
            enabled,
            factory: Box::new(factory),
        });
        log::debug!("Registered system '{}' at order {}", name, order);
        Ok(())
    }

    /// True if a system with this name is registered
    pub fn contains(&self, name: &str) -> bool {
        self.registrations.iter().any(|r| r.name == name)
    }

    /// Number of registered systems
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    /// True when nothing is registered
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Instantiate every registration in execution order
    fn instantiate(&mut self) -> Vec<SystemEntry> {
        // Stable sort keeps registration order within a tier
        self.registrations.sort_by_key(|r| r.order);
        self.registrations
            .iter()
            .map(|r| SystemEntry {
                name: r.name.clone(),
                order: r.order,
                enabled: r.enabled,
                system: (r.factory)(),
            })
            .collect()
    }

    fn set_enabled(&mut self, name: &str, enabled: bool) -> bool {
        match self.registrations.iter_mut().find(|r| r.name == name) {
            Some(registration) => {
                registration.enabled = enabled;
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for SystemPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.registrations.iter().map(|r| (&r.name, r.order, r.enabled)))
            .finish()
    }
}

struct SystemEntry {
    name: String,
    order: i32,
    enabled: bool,
    system: Box<dyn System>,
}

#[derive(Clone, Copy)]
enum Hook<'e> {
    Awake,
    Start,
    Update,
    Notify(&'e GameEvent),
}

impl Hook<'_> {
    const fn label(self) -> &'static str {
        match self {
            Self::Awake => "awake",
            Self::Start => "start",
            Self::Update => "update",
            Self::Notify(_) => "on_notify",
        }
    }
}

type Listener = Box<dyn FnMut(&GameEvent)>;

/// The simulation: entities, systems, pathing grid and frame clock
pub struct World {
    config: WorldConfig,
    state: WorldState,
    pool: SystemPool,
    systems: Vec<SystemEntry>,
    entities: EntityManager,
    pathfinder: Pathfinder,
    prefabs: PrefabLibrary,
    clock: FrameClock,
    listeners: Vec<Listener>,
}

impl World {
    /// World over the built-in component types
    pub fn new(config: WorldConfig) -> Result<Self, EcsError> {
        Self::with_registry(ComponentRegistry::builtin()?, config)
    }

    /// World over a custom component registry
    pub fn with_registry(registry: ComponentRegistry, config: WorldConfig) -> Result<Self, EcsError> {
        Ok(Self {
            config,
            state: WorldState::Uninitialized,
            pool: SystemPool::new(),
            systems: Vec::new(),
            entities: EntityManager::new(registry)?,
            pathfinder: Pathfinder::default(),
            prefabs: PrefabLibrary::new(),
            clock: FrameClock::new(),
            listeners: Vec::new(),
        })
    }

    // ---------------------------------------------------------------------
    // Registration
    // ---------------------------------------------------------------------

    /// Register a system factory; only allowed before [`awake`](Self::awake)
    pub fn register<F>(&mut self, name: &str, order: i32, enabled: bool, factory: F) -> Result<(), EcsError>
    where
        F: Fn() -> Box<dyn System> + 'static,
    {
        self.expect_state("register", &[WorldState::Uninitialized])?;
        self.pool.register(name, order, enabled, factory)
    }

    /// Register a default-constructed system under its own name and order
    pub fn register_system<S>(&mut self) -> Result<(), EcsError>
    where
        S: System + Default + 'static,
    {
        let probe = S::default();
        self.register(probe.name(), probe.order(), true, || Box::new(S::default()))
    }

    /// Receive every broadcast event after all systems have seen it
    pub fn subscribe<F>(&mut self, listener: F)
    where
        F: FnMut(&GameEvent) + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    /// Enable or disable a system by name, returns false if unknown
    ///
    /// Takes effect the next time the system would be updated. Disabled
    /// systems still receive broadcast events.
    pub fn set_system_enabled(&mut self, name: &str, enabled: bool) -> bool {
        let known = self.pool.set_enabled(name, enabled);
        if let Some(entry) = self.systems.iter_mut().find(|e| e.name == name) {
            entry.enabled = enabled;
        }
        if known {
            log::debug!("System '{}' {}", name, if enabled { "enabled" } else { "disabled" });
        } else {
            log::warn!("No system named '{}'", name);
        }
        known
    }

    /// Whether a system is enabled, `None` if unknown
    pub fn is_system_enabled(&self, name: &str) -> Option<bool> {
        self.pool
            .registrations
            .iter()
            .find(|r| r.name == name)
            .map(|r| r.enabled)
    }

    /// Names of the instantiated systems in execution order
    pub fn system_names(&self) -> Vec<&str> {
        self.systems.iter().map(|e| e.name.as_str()).collect()
    }

    // ---------------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------------

    fn expect_state(&self, operation: &'static str, allowed: &[WorldState]) -> Result<(), EcsError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(EcsError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    /// Instantiate every registered system and run their awake hooks
    pub fn awake(&mut self) -> Result<(), EcsError> {
        self.expect_state("awake", &[WorldState::Uninitialized])?;
        self.systems = self.pool.instantiate();
        self.state = WorldState::Awake;
        log::info!(
            "World awake with {} systems: {:?}",
            self.systems.len(),
            self.systems.iter().map(|e| (e.name.as_str(), e.order)).collect::<Vec<_>>()
        );
        self.run_hooks(Hook::Awake);
        Ok(())
    }

    /// Run the start hooks, once the scene is in place
    pub fn start(&mut self) -> Result<(), EcsError> {
        self.expect_state("start", &[WorldState::Awake])?;
        self.state = WorldState::Started;
        self.run_hooks(Hook::Start);
        log::info!("World started");
        Ok(())
    }

    /// Advance the clock by `delta` seconds and update every enabled system
    pub fn update(&mut self, delta: f32) -> Result<FrameTime, EcsError> {
        self.expect_state("update", &[WorldState::Started, WorldState::Running])?;
        self.state = WorldState::Running;
        let time = self.clock.advance(delta);
        self.run_hooks(Hook::Update);
        Ok(time)
    }

    /// Advance the clock from the wall clock and update
    pub fn tick(&mut self) -> Result<FrameTime, EcsError> {
        self.expect_state("update", &[WorldState::Started, WorldState::Running])?;
        self.state = WorldState::Running;
        let time = self.clock.tick();
        self.run_hooks(Hook::Update);
        Ok(time)
    }

    /// Deliver an event to every system in order, then to the listeners
    pub fn broadcast(&mut self, event: GameEvent) {
        self.dispatch(&event, 0);
    }

    /// Drop all entities and system instances, keeping registrations and prefabs
    ///
    /// The world returns to [`WorldState::Uninitialized`]; the next
    /// [`awake`](Self::awake) instantiates fresh systems.
    pub fn reset(&mut self) -> Result<(), EcsError> {
        self.systems.clear();
        self.entities.clear()?;
        let mode = self.pathfinder.default_mode();
        self.pathfinder = Pathfinder::new(self.pathfinder.grid().cols(), self.pathfinder.grid().rows());
        self.pathfinder.set_default_mode(mode);
        self.clock.reset();
        self.state = WorldState::Uninitialized;
        log::info!("World reset");
        Ok(())
    }

    fn run_hooks(&mut self, hook: Hook<'_>) {
        for index in 0..self.systems.len() {
            if !self.systems[index].enabled {
                continue;
            }
            for event in self.invoke(index, hook) {
                self.dispatch(&event, 0);
            }
        }
    }

    fn dispatch(&mut self, event: &GameEvent, depth: usize) {
        if depth >= self.config.max_event_depth {
            log::error!(
                "Dropping {:?} event: nesting depth {} reached the limit of {}",
                event.kind(),
                depth,
                self.config.max_event_depth
            );
            return;
        }
        for index in 0..self.systems.len() {
            for nested in self.invoke(index, Hook::Notify(event)) {
                self.dispatch(&nested, depth + 1);
            }
        }
        for listener in &mut self.listeners {
            listener(event);
        }
    }

    fn invoke(&mut self, index: usize, hook: Hook<'_>) -> Vec<GameEvent> {
        let time = self.clock.now();
        let Some(entry) = self.systems.get_mut(index) else {
            return Vec::new();
        };
        let mut ctx = SystemContext::new(&mut self.entities, &mut self.pathfinder, &self.prefabs, time);
        let result = match hook {
            Hook::Awake => entry.system.awake(&mut ctx),
            Hook::Start => entry.system.start(&mut ctx),
            Hook::Update => entry.system.update(&mut ctx),
            Hook::Notify(event) => entry.system.on_notify(&mut ctx, event),
        };
        if let Err(err) = result {
            log::error!("System '{}' failed in {}: {}", entry.name, hook.label(), err);
        }
        ctx.into_events()
    }

    // ---------------------------------------------------------------------
    // Scene and data
    // ---------------------------------------------------------------------

    /// Replace the loaded prefab library
    pub fn set_prefabs(&mut self, prefabs: PrefabLibrary) {
        log::info!("Loaded {} prefabs into the world", prefabs.len());
        self.prefabs = prefabs;
    }

    /// Rebuild the pathing grid from a collision map
    pub fn set_collision_map(&mut self, rows: &[Vec<u8>]) {
        self.pathfinder.rebuild(rows);
    }

    /// Instantiate a scene under the world root and announce it
    pub fn load_scene(&mut self, scene: &SceneDocument) -> Result<EntityId, EcsError> {
        let root = scene.resolved_root(&self.prefabs)?;
        let world_root = self.entities.root();
        let id = self.entities.create_entity_from_prefab(&root, Some(world_root))?;
        log::info!("Loaded scene '{}' as {} ({} nodes)", scene.name, id, root.node_count());
        self.broadcast(GameEvent::scene_loaded(scene.name.clone(), id));
        Ok(id)
    }

    /// Instantiate a loaded prefab by name
    pub fn spawn(
        &mut self,
        prefab: &str,
        parent: Option<EntityId>,
        identity: &IdentityOverride,
    ) -> Result<EntityId, EcsError> {
        self.entities
            .create_entity_from_loaded_prefab(&self.prefabs, prefab, parent, identity)
    }

    // ---------------------------------------------------------------------
    // Accessors
    // ---------------------------------------------------------------------

    /// Lifecycle state
    pub const fn state(&self) -> WorldState {
        self.state
    }

    /// World configuration
    pub const fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Entity manager
    pub const fn entities(&self) -> &EntityManager {
        &self.entities
    }

    /// Mutable entity manager
    pub fn entities_mut(&mut self) -> &mut EntityManager {
        &mut self.entities
    }

    /// Pathfinder
    pub const fn pathfinder(&self) -> &Pathfinder {
        &self.pathfinder
    }

    /// Mutable pathfinder
    pub fn pathfinder_mut(&mut self) -> &mut Pathfinder {
        &mut self.pathfinder
    }

    /// Loaded prefabs
    pub const fn prefabs(&self) -> &PrefabLibrary {
        &self.prefabs
    }

    /// Timing of the last update
    pub const fn time(&self) -> FrameTime {
        self.clock.now()
    }
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("state", &self.state)
            .field("systems", &self.system_names())
            .field("entities", &self.entities.len())
            .field("prefabs", &self.prefabs.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::ecs::components::Health;
    use crate::events::EventKind;

    type Log = Rc<RefCell<Vec<String>>>;

    /// Records every hook call as "name:hook"
    struct Recorder {
        name: &'static str,
        log: Log,
        echo: Option<EventKind>,
    }

    impl System for Recorder {
        fn name(&self) -> &'static str {
            self.name
        }

        fn awake(&mut self, _ctx: &mut SystemContext<'_>) -> Result<(), EcsError> {
            self.log.borrow_mut().push(format!("{}:awake", self.name));
            Ok(())
        }

        fn start(&mut self, _ctx: &mut SystemContext<'_>) -> Result<(), EcsError> {
            self.log.borrow_mut().push(format!("{}:start", self.name));
            Ok(())
        }

        fn update(&mut self, _ctx: &mut SystemContext<'_>) -> Result<(), EcsError> {
            self.log.borrow_mut().push(format!("{}:update", self.name));
            Ok(())
        }

        fn on_notify(&mut self, ctx: &mut SystemContext<'_>, event: &GameEvent) -> Result<(), EcsError> {
            self.log.borrow_mut().push(format!("{}:{:?}", self.name, event.kind()));
            if Some(event.kind()) == self.echo {
                ctx.broadcast(GameEvent::notification(self.name));
            }
            Ok(())
        }
    }

    fn recorder(world: &mut World, name: &'static str, order: i32, log: &Log) {
        let log = Rc::clone(log);
        world
            .register(name, order, true, move || {
                Box::new(Recorder {
                    name,
                    log: Rc::clone(&log),
                    echo: None,
                })
            })
            .unwrap();
    }

    fn world() -> World {
        crate::foundation::logging::init_for_tests();
        World::new(WorldConfig::default()).unwrap()
    }

    fn take(log: &Log) -> Vec<String> {
        std::mem::take(&mut *log.borrow_mut())
    }

    #[test]
    fn test_systems_run_in_ascending_order() {
        let log = Log::default();
        let mut world = world();
        recorder(&mut world, "ten", 10, &log);
        recorder(&mut world, "minus_five", -5, &log);
        recorder(&mut world, "zero", 0, &log);

        world.awake().unwrap();
        assert_eq!(world.system_names(), vec!["minus_five", "zero", "ten"]);
        assert_eq!(take(&log), vec!["minus_five:awake", "zero:awake", "ten:awake"]);

        world.start().unwrap();
        assert_eq!(take(&log), vec!["minus_five:start", "zero:start", "ten:start"]);

        world.update(0.016).unwrap();
        assert_eq!(take(&log), vec!["minus_five:update", "zero:update", "ten:update"]);
        assert_eq!(world.state(), WorldState::Running);
    }

    #[test]
    fn test_equal_orders_keep_registration_order() {
        let log = Log::default();
        let mut world = world();
        recorder(&mut world, "b", 0, &log);
        recorder(&mut world, "a", 0, &log);
        recorder(&mut world, "c", -1, &log);
        world.awake().unwrap();
        assert_eq!(world.system_names(), vec!["c", "b", "a"]);
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let log = Log::default();
        let mut world = world();
        recorder(&mut world, "one", 0, &log);
        let err = world.register("one", 5, true, || Box::new(crate::ecs::systems::CombatSystem::default()));
        assert_eq!(err, Err(EcsError::DuplicateSystem("one".into())));
    }

    #[test]
    fn test_lifecycle_order_is_enforced() {
        let mut world = world();
        assert!(matches!(world.start(), Err(EcsError::InvalidState { operation: "start", .. })));
        assert!(world.update(0.1).is_err());
        world.awake().unwrap();
        assert!(world.awake().is_err());
        assert!(world.update(0.1).is_err());
        world.start().unwrap();
        assert!(world.update(0.1).is_ok());
        assert!(world
            .register_system::<crate::ecs::systems::CombatSystem>()
            .is_err());
    }

    #[test]
    fn test_disabled_systems_skip_updates_but_see_events() {
        let log = Log::default();
        let mut world = world();
        recorder(&mut world, "on", 0, &log);
        recorder(&mut world, "off", 1, &log);
        assert!(world.set_system_enabled("off", false));
        assert!(!world.set_system_enabled("missing", false));

        world.awake().unwrap();
        world.start().unwrap();
        world.update(0.1).unwrap();
        world.broadcast(GameEvent::notification("hello"));

        assert_eq!(
            take(&log),
            vec!["on:awake", "on:start", "on:update", "on:Notification", "off:Notification"]
        );
        assert_eq!(world.is_system_enabled("off"), Some(false));
    }

    #[test]
    fn test_nested_events_dispatch_depth_first() {
        let log = Log::default();
        let mut world = world();
        for (name, order, echo) in [("first", 0, Some(EventKind::Death)), ("second", 1, None)] {
            let log = Rc::clone(&log);
            world
                .register(name, order, true, move || {
                    Box::new(Recorder {
                        name,
                        log: Rc::clone(&log),
                        echo,
                    })
                })
                .unwrap();
        }
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        world.subscribe(move |event| sink.borrow_mut().push(event.kind()));

        world.awake().unwrap();
        take(&log);
        world.broadcast(GameEvent::death(EntityId::from_raw(1)));

        // The notification raised by "first" reaches everyone before "second" sees the death
        assert_eq!(
            take(&log),
            vec!["first:Death", "first:Notification", "second:Notification", "second:Death"]
        );
        assert_eq!(*seen.borrow(), vec![EventKind::Notification, EventKind::Death]);
    }

    /// Re-raises every notification it sees
    struct Echo;

    impl System for Echo {
        fn name(&self) -> &'static str {
            "echo"
        }

        fn on_notify(&mut self, ctx: &mut SystemContext<'_>, event: &GameEvent) -> Result<(), EcsError> {
            ctx.broadcast(event.clone());
            Ok(())
        }
    }

    #[test]
    fn test_event_depth_is_bounded() {
        let mut world = World::new(WorldConfig { max_event_depth: 4 }).unwrap();
        world.register("echo", 0, true, || Box::new(Echo)).unwrap();
        let count = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&count);
        world.subscribe(move |_| *counter.borrow_mut() += 1);

        world.awake().unwrap();
        world.broadcast(GameEvent::notification("loop"));
        assert_eq!(*count.borrow(), 4);
    }

    /// Fails every update
    struct Broken;

    impl System for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn update(&mut self, _ctx: &mut SystemContext<'_>) -> Result<(), EcsError> {
            Err(EcsError::SystemFailed {
                system: "broken",
                message: "always".into(),
            })
        }
    }

    #[test]
    fn test_failing_hook_does_not_stop_the_frame() {
        let log = Log::default();
        let mut world = world();
        world.register("broken", -1, true, || Box::new(Broken)).unwrap();
        recorder(&mut world, "after", 0, &log);
        world.awake().unwrap();
        world.start().unwrap();
        take(&log);
        world.update(0.1).unwrap();
        assert_eq!(take(&log), vec!["after:update"]);
    }

    #[test]
    fn test_update_advances_clock() {
        let mut world = world();
        world.awake().unwrap();
        world.start().unwrap();
        for _ in 0..10 {
            world.update(0.25).unwrap();
        }
        let time = world.time();
        assert_eq!(time.frame, 10);
        approx::assert_relative_eq!(time.elapsed, 2.5);
        approx::assert_relative_eq!(time.delta, 0.25);
        approx::assert_relative_eq!(time.fps, 4.0);
    }

    #[test]
    fn test_load_scene_instantiates_under_root() {
        let mut world = world();
        world.set_prefabs(
            PrefabLibrary::from_json(r#"[{ "name": "Rat", "components": { "Health": { "hp": "3" } } }]"#).unwrap(),
        );
        let scene = SceneDocument::from_json(
            r#"{ "name": "cellar", "root": { "name": "Cellar", "children": [ { "ref": "Rat" }, { "ref": "Rat" } ] } }"#,
        )
        .unwrap();

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        world.subscribe(move |event| sink.borrow_mut().push(event.clone()));

        let id = world.load_scene(&scene).unwrap();
        let entities = world.entities();
        assert_eq!(entities.get_entity_with_id(id).unwrap().parent(), Some(entities.root()));
        assert_eq!(entities.get_entities_with_name("Rat").len(), 2);
        assert_eq!(entities.entities_with_component::<Health>().len(), 2);
        assert_eq!(*seen.borrow(), vec![GameEvent::scene_loaded("cellar", id)]);
    }

    #[test]
    fn test_reset_returns_to_uninitialized() {
        let log = Log::default();
        let mut world = world();
        recorder(&mut world, "only", 0, &log);
        world.awake().unwrap();
        world.start().unwrap();
        world.entities_mut().create_entity("temp", None).unwrap();

        world.reset().unwrap();
        assert_eq!(world.state(), WorldState::Uninitialized);
        assert_eq!(world.entities().len(), 1);
        assert!(world.system_names().is_empty());

        take(&log);
        world.awake().unwrap();
        assert_eq!(take(&log), vec!["only:awake"]);
    }
}
