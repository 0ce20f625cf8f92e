//! Entity inspector.
//!
//! The inspector tracks the selected entity and edits it. It is shown in the
//! window title, and the selected entity is tinted in the colour pass.

use std::fmt;

use cgmath::Vector3;
use winit::{dpi::PhysicalPosition, keyboard::KeyCode};

use crate::{
    context::Context,
    entity::Entity,
    pick::{PickBuffer, PickError, resolve_pick},
    render::Renderer,
    resources::Assets,
    world::World,
};

/// Distance of one nudge step.
pub const NUDGE_STEP: f32 = 0.25;
/// Degrees of one rotate step about y.
pub const ROTATE_STEP: f32 = 15.0;
pub const SCALE_STEP: f32 = 0.1;
const MIN_SCALE: f32 = 0.1;

/// Colours cycled through by [`InspectorCommand::CycleColor`].
pub const COLOR_PRESETS: [[f32; 3]; 5] = [
    [1.0, 1.0, 1.0],
    [1.0, 0.5, 0.5],
    [0.5, 1.0, 0.5],
    [0.5, 0.5, 1.0],
    [1.0, 0.85, 0.4],
];

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InspectorCommand {
    Back,
    Next,
    ToggleActive,
    Nudge(Vector3<f32>),
    Rotate(f32),
    Scale(f32),
    CycleColor,
}

impl InspectorCommand {
    pub fn from_key(key: KeyCode) -> Option<Self> {
        let nudge = |x: f32, y: f32, z: f32| Self::Nudge(Vector3::new(x, y, z) * NUDGE_STEP);
        Some(match key {
            KeyCode::BracketLeft => Self::Back,
            KeyCode::BracketRight => Self::Next,
            KeyCode::Tab => Self::ToggleActive,
            KeyCode::ArrowLeft => nudge(-1.0, 0.0, 0.0),
            KeyCode::ArrowRight => nudge(1.0, 0.0, 0.0),
            KeyCode::ArrowUp => nudge(0.0, 0.0, -1.0),
            KeyCode::ArrowDown => nudge(0.0, 0.0, 1.0),
            KeyCode::PageUp => nudge(0.0, 1.0, 0.0),
            KeyCode::PageDown => nudge(0.0, -1.0, 0.0),
            KeyCode::KeyR => Self::Rotate(ROTATE_STEP),
            KeyCode::Equal | KeyCode::NumpadAdd => Self::Scale(SCALE_STEP),
            KeyCode::Minus | KeyCode::NumpadSubtract => Self::Scale(-SCALE_STEP),
            KeyCode::KeyC => Self::CycleColor,
            _ => return None,
        })
    }
}

/// Read-only view of the selected entity.
#[derive(Clone, Copy, Debug)]
pub struct Panel<'w> {
    pub index: usize,
    pub entity: &'w Entity,
}

impl Panel<'_> {
    /// All inspected fields on one line.
    pub fn details(&self) -> String {
        let t = &self.entity.transform;
        format!(
            "{} rotation ({:.1}, {:.1}, {:.1}) scale ({:.2}, {:.2}, {:.2}) color {:?}",
            self,
            t.rotation.x,
            t.rotation.y,
            t.rotation.z,
            t.scale.x,
            t.scale.y,
            t.scale.z,
            self.entity.color
        )
    }
}

impl fmt::Display for Panel<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = self.entity.transform.position;
        write!(
            f,
            "Entity ID: {} | {} | {} | pos ({:.2}, {:.2}, {:.2})",
            self.index,
            self.entity.tag,
            if self.entity.active { "active" } else { "inactive" },
            p.x,
            p.y,
            p.z
        )
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Inspector {
    selected: usize,
}

impl Inspector {
    pub fn selected(&self) -> usize {
        self.selected
    }

    /// The selected index, if it names an entity of `world`.
    pub fn selection(&self, world: &World) -> Option<usize> {
        (self.selected < world.len()).then_some(self.selected)
    }

    pub fn next(&mut self, count: usize) {
        if count > 0 {
            self.selected = (self.selected % count + 1) % count;
        }
    }

    pub fn back(&mut self, count: usize) {
        if count > 0 {
            self.selected = (self.selected % count + count - 1) % count;
        }
    }

    /// Select the entity a pick sample points at.
    ///
    /// Background and out of range samples keep the previous selection.
    /// Returns whether the selection was replaced.
    pub fn apply_pick(&mut self, sample: Option<i32>, count: usize) -> bool {
        match resolve_pick(sample, count) {
            Some(index) => {
                self.selected = index;
                true
            }
            None => false,
        }
    }

    /// `None` when there is nothing to inspect.
    pub fn panel<'w>(&self, world: &'w World) -> Option<Panel<'w>> {
        let index = self.selection(world)?;
        world.get(index).map(|entity| Panel { index, entity })
    }

    /// Apply a command. Returns `false` if there was nothing to apply it to.
    pub fn apply(&mut self, command: InspectorCommand, world: &mut World) -> bool {
        let count = world.len();
        match command {
            InspectorCommand::Back => self.back(count),
            InspectorCommand::Next => self.next(count),
            _ => {
                let Some(entity) = self
                    .selection(world)
                    .and_then(|index| world.get_mut(index))
                else {
                    return false;
                };
                edit(entity, command);
                log::info!("Edited entity {}: {:?}", self.selected, command);
                return true;
            }
        }
        if let Some(panel) = self.panel(world) {
            log::info!("Selected {}", panel.details());
        }
        count > 0
    }
}

fn edit(entity: &mut Entity, command: InspectorCommand) {
    let transform = &mut entity.transform;
    match command {
        InspectorCommand::ToggleActive => entity.active = !entity.active,
        InspectorCommand::Nudge(offset) => transform.position += offset,
        InspectorCommand::Rotate(degrees) => {
            transform.rotation.y = (transform.rotation.y + degrees).rem_euclid(360.0);
        }
        InspectorCommand::Scale(delta) => {
            let grow = |s: f32| (s + delta).max(MIN_SCALE);
            transform.scale = Vector3::new(grow(transform.scale.x), grow(transform.scale.y), grow(transform.scale.z));
        }
        InspectorCommand::CycleColor => {
            let next = COLOR_PRESETS
                .iter()
                .position(|c| *c == entity.color)
                .map_or(0, |i| (i + 1) % COLOR_PRESETS.len());
            entity.color = COLOR_PRESETS[next];
        }
        InspectorCommand::Back | InspectorCommand::Next => {}
    }
}

/// Inspector plus the pick target that feeds it.
#[derive(Debug)]
pub struct Editor {
    inspector: Inspector,
    pick: PickBuffer,
    title: String,
}

impl Editor {
    pub fn new(pick: PickBuffer, title: impl Into<String>) -> Self {
        Self {
            inspector: Inspector::default(),
            pick,
            title: title.into(),
        }
    }

    pub fn inspector(&self) -> &Inspector {
        &self.inspector
    }

    /// Swap in a pick target matching the new surface size.
    pub fn set_pick_buffer(&mut self, pick: PickBuffer) {
        self.pick = pick;
    }

    pub fn pick_buffer(&self) -> &PickBuffer {
        &self.pick
    }

    /// Pick the entity under `cursor`. Returns whether the selection changed.
    pub fn pick(
        &mut self,
        ctx: &Context,
        renderer: &Renderer,
        world: &World,
        assets: &Assets,
        async_runtime: &tokio::runtime::Runtime,
        cursor: PhysicalPosition<f64>,
    ) -> Result<bool, PickError> {
        let sample = self
            .pick
            .render_and_read(ctx, renderer, world, assets, async_runtime, cursor)?;
        let picked = self.inspector.apply_pick(sample, world.len());
        match (picked, self.inspector.panel(world)) {
            (true, Some(panel)) => log::info!("Picked {}", panel.details()),
            _ => log::debug!("Pick sample {:?} at {:?} selects nothing", sample, cursor),
        }
        Ok(picked)
    }

    /// Returns `true` if the key was an inspector key.
    pub fn handle_key(&mut self, key: KeyCode, world: &mut World) -> bool {
        match InspectorCommand::from_key(key) {
            Some(command) => {
                self.inspector.apply(command, world);
                true
            }
            None => false,
        }
    }

    /// Window title with the inspector panel appended.
    pub fn title(&self, world: &World) -> String {
        match self.inspector.panel(world) {
            Some(panel) => format!("{} | {}", self.title, panel),
            None => self.title.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{ModelId, ShaderKind};

    fn world_with(tags: &[&str]) -> World {
        let mut world = World::default();
        for (i, tag) in tags.iter().enumerate() {
            world.spawn(
                Entity::new(*tag, ModelId(0), ShaderKind::Standard)
                    .with_position(Vector3::new(i as f32, 0.0, 0.0)),
            );
        }
        world
    }

    #[test]
    fn next_and_back_wrap_around() {
        let mut inspector = Inspector::default();
        inspector.back(3);
        assert_eq!(inspector.selected(), 2);
        inspector.next(3);
        assert_eq!(inspector.selected(), 0);
        inspector.next(3);
        assert_eq!(inspector.selected(), 1);
        inspector.next(0);
        assert_eq!(inspector.selected(), 1);
    }

    #[test]
    fn invalid_pick_keeps_the_selection() {
        let mut inspector = Inspector::default();
        assert!(inspector.apply_pick(Some(2), 3));
        assert!(!inspector.apply_pick(Some(-1), 3));
        assert!(!inspector.apply_pick(Some(3), 3));
        assert!(!inspector.apply_pick(None, 3));
        assert_eq!(inspector.selected(), 2);
    }

    #[test]
    fn empty_world_has_no_panel() {
        let mut world = World::default();
        let mut inspector = Inspector::default();
        assert!(inspector.panel(&world).is_none());
        assert!(!inspector.apply(InspectorCommand::Next, &mut world));
        assert!(!inspector.apply(InspectorCommand::ToggleActive, &mut world));
    }

    #[test]
    fn panel_renders_into_the_title() {
        let world = world_with(&["glass", "fire"]);
        let mut inspector = Inspector::default();
        inspector.next(world.len());
        let panel = inspector.panel(&world).unwrap();
        assert_eq!(
            panel.to_string(),
            "Entity ID: 1 | fire | active | pos (1.00, 0.00, 0.00)"
        );
    }

    #[test]
    fn edits_change_the_selected_entity_only() {
        let mut world = world_with(&["glass", "dirt"]);
        let mut inspector = Inspector::default();
        inspector.apply(InspectorCommand::Next, &mut world);

        assert!(inspector.apply(InspectorCommand::ToggleActive, &mut world));
        assert!(inspector.apply(InspectorCommand::from_key(KeyCode::PageUp).unwrap(), &mut world));
        assert!(inspector.apply(InspectorCommand::Rotate(ROTATE_STEP), &mut world));
        assert!(inspector.apply(InspectorCommand::Scale(-SCALE_STEP), &mut world));
        assert!(inspector.apply(InspectorCommand::CycleColor, &mut world));

        let dirt = world.get(1).unwrap();
        assert!(!dirt.active);
        assert_eq!(dirt.transform.position, Vector3::new(1.0, NUDGE_STEP, 0.0));
        assert_eq!(dirt.transform.rotation.y, ROTATE_STEP);
        assert!((dirt.transform.scale.x - 0.9).abs() < 1e-6);
        assert_eq!(dirt.color, COLOR_PRESETS[1]);

        let glass = world.get(0).unwrap();
        assert!(glass.active);
        assert_eq!(glass.color, COLOR_PRESETS[0]);
    }

    #[test]
    fn scale_never_collapses() {
        let mut world = world_with(&["glass"]);
        let mut inspector = Inspector::default();
        for _ in 0..20 {
            inspector.apply(InspectorCommand::Scale(-SCALE_STEP), &mut world);
        }
        assert_eq!(world.get(0).unwrap().transform.scale.y, MIN_SCALE);
    }

    #[test]
    fn camera_keys_are_not_inspector_keys() {
        assert!(InspectorCommand::from_key(KeyCode::KeyW).is_none());
        assert_eq!(InspectorCommand::from_key(KeyCode::Tab), Some(InspectorCommand::ToggleActive));
    }
}
