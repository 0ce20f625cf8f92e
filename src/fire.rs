//! Flip-book fire animation.
//!
//! The world advances one [`FireAnimation`] per frame; every fire entity
//! reads the shared frame in its update callback ([`animate_fire`]).

use instant::Duration;

use crate::entity::{Entity, TextureId, UpdateCtx};

/// Number of frames in the fire flip-book (`fire_1.png` … `fire_31.png`).
pub const FIRE_FRAME_COUNT: usize = 31;
/// Time each fire frame stays on screen.
pub const FIRE_FRAME_DURATION: Duration = Duration::from_millis(50);

#[derive(Clone, Debug)]
pub struct FireAnimation {
    frames: Vec<Option<TextureId>>,
    frame_duration: Duration,
    timer: Duration,
    current: usize,
}

impl FireAnimation {
    /// `frames` may contain `None` for textures that failed to load; they
    /// still take their slot in the sequence.
    pub fn new(frames: Vec<Option<TextureId>>, frame_duration: Duration) -> Self {
        Self {
            frames,
            frame_duration,
            timer: Duration::ZERO,
            current: 0,
        }
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn current_frame(&self) -> usize {
        self.current
    }

    pub fn current_texture(&self) -> Option<TextureId> {
        self.frames.get(self.current).copied().flatten()
    }

    /// Time carried over towards the next frame. Always below one frame duration.
    pub fn remainder(&self) -> Duration {
        self.timer
    }

    /// Add `dt` to the timer and step one frame per elapsed frame duration.
    ///
    /// The remainder is kept rather than reset so the animation does not
    /// drift. Returns the number of frames stepped.
    pub fn advance(&mut self, dt: Duration) -> usize {
        if self.frame_duration.is_zero() || self.frames.is_empty() {
            return 0;
        }
        self.timer += dt;
        let mut stepped = 0;
        while self.timer >= self.frame_duration {
            self.timer -= self.frame_duration;
            self.current = (self.current + 1) % self.frames.len();
            stepped += 1;
        }
        if stepped > 0 {
            log::debug!("Fire animation frame: {}", self.current);
        }
        stepped
    }
}

impl Default for FireAnimation {
    fn default() -> Self {
        Self::new(vec![None; FIRE_FRAME_COUNT], FIRE_FRAME_DURATION)
    }
}

/// Vertical flicker factor at `time` seconds.
pub fn flicker(time: f32) -> f32 {
    0.9 + 0.1 * (time * 10.0).sin()
}

/// Update callback of fire entities: show the current frame and flicker.
pub fn animate_fire(ctx: &UpdateCtx<'_>, entity: &mut Entity) {
    entity.albedo = ctx.fire.current_texture();
    entity.transform.scale = cgmath::Vector3::new(1.0, flicker(ctx.time), 1.0);
}

#[cfg(test)]
mod tests {
    use rand::{Rng, SeedableRng, rngs::StdRng};

    use super::*;
    use crate::entity::{ModelId, ShaderKind};

    fn frames(n: usize) -> Vec<Option<TextureId>> {
        (0..n).map(|i| Some(TextureId(100 + i))).collect()
    }

    #[test]
    fn steps_once_per_frame_duration() {
        let mut anim = FireAnimation::new(frames(4), Duration::from_millis(50));
        assert_eq!(anim.advance(Duration::from_millis(49)), 0);
        assert_eq!(anim.current_frame(), 0);
        assert_eq!(anim.advance(Duration::from_millis(1)), 1);
        assert_eq!(anim.current_frame(), 1);
        assert_eq!(anim.remainder(), Duration::ZERO);
    }

    #[test]
    fn keeps_the_remainder() {
        let mut anim = FireAnimation::new(frames(4), Duration::from_millis(50));
        anim.advance(Duration::from_millis(70));
        assert_eq!(anim.current_frame(), 1);
        assert_eq!(anim.remainder(), Duration::from_millis(20));
        anim.advance(Duration::from_millis(30));
        assert_eq!(anim.current_frame(), 2);
        assert_eq!(anim.remainder(), Duration::ZERO);
    }

    #[test]
    fn wraps_around_the_last_frame() {
        let mut anim = FireAnimation::new(frames(3), Duration::from_millis(10));
        anim.advance(Duration::from_millis(30));
        assert_eq!(anim.current_frame(), 0);
        anim.advance(Duration::from_millis(10));
        assert_eq!(anim.current_texture(), Some(TextureId(101)));
    }

    #[test]
    fn drift_stays_below_one_frame_under_jitter() {
        let frame = Duration::from_millis(50);
        let mut anim = FireAnimation::new(frames(FIRE_FRAME_COUNT), frame);
        let mut rng = StdRng::seed_from_u64(42);
        let mut total = Duration::ZERO;
        let mut stepped = 0u128;
        for _ in 0..10_000 {
            let dt = Duration::from_micros(rng.gen_range(0..200_000));
            total += dt;
            stepped += anim.advance(dt) as u128;
            assert!(anim.remainder() < frame);
        }
        assert_eq!(stepped, total.as_nanos() / frame.as_nanos());
        assert_eq!(anim.remainder().as_nanos(), total.as_nanos() % frame.as_nanos());
        assert_eq!(
            anim.current_frame() as u128,
            stepped % FIRE_FRAME_COUNT as u128
        );
    }

    #[test]
    fn empty_animation_never_steps() {
        let mut anim = FireAnimation::new(Vec::new(), Duration::from_millis(50));
        assert_eq!(anim.frame_count(), 0);
        assert_eq!(anim.advance(Duration::from_secs(1)), 0);
        assert_eq!(anim.current_texture(), None);
    }

    #[test]
    fn animate_fire_swaps_texture_and_flickers() {
        let mut anim = FireAnimation::new(frames(5), Duration::from_millis(50));
        anim.advance(Duration::from_millis(100));
        let ctx = UpdateCtx {
            dt: Duration::from_millis(16),
            time: 0.0,
            fire: &anim,
        };
        let mut fire = Entity::new("fire", ModelId(0), ShaderKind::Fire);
        animate_fire(&ctx, &mut fire);
        assert_eq!(fire.albedo, Some(TextureId(102)));
        assert_eq!(fire.transform.scale, cgmath::Vector3::new(1.0, 0.9, 1.0));
    }

    #[test]
    fn flicker_stays_between_point_eight_and_one() {
        for i in 0..1000 {
            let f = flicker(i as f32 * 0.013);
            assert!((0.8..=1.0).contains(&f), "{f}");
        }
    }
}
