//! Rendering backend abstraction and the per-frame drawing pass.
//!
//! The core owns no pixels. [`FrameRenderer`] turns the visible drawables of
//! a frame into primitive calls on a [`RenderBackend`].

use std::collections::HashSet;

use crate::{
    animation::{CircleVisual, Drawable, HoldVisual, SliderVisual, SpinnerVisual, Visual},
    math::{PLAYFIELD_HEIGHT, PLAYFIELD_WIDTH},
    DrawableSet, Pos2,
};

const SPINNER_SIZE: f32 = PLAYFIELD_HEIGHT * 0.8;
const FOLLOW_CIRCLE_SIZE: f32 = 2.4;
const TICK_SIZE: f32 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const WHITE: Self = Self::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
            a: 1.0,
        }
    }

    pub fn with_alpha(self, alpha: f32) -> Self {
        Self { a: alpha, ..self }
    }
}

/// Default combo colours.
pub const COMBO_COLOURS: [Rgba; 4] = [
    Rgba::rgb(255, 192, 0),
    Rgba::rgb(0, 202, 0),
    Rgba::rgb(18, 124, 255),
    Rgba::rgb(242, 24, 57),
];

/// Skin elements the backend knows how to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sprite {
    HitCircleOverlay,
    ApproachCircle,
    HitFlash,
    HitBurst,
    SliderBall,
    FollowCircle,
    SliderTick,
    ReverseArrow,
    Spinner,
    SpinnerApproach,
}

/// Primitive drawing capabilities of the host.
pub trait RenderBackend {
    fn draw_circle(&mut self, center: Pos2, radius: f32, colour: Rgba);
    fn stroke_path(&mut self, points: &[Pos2], width: f32, colour: Rgba);
    /// Draws `sprite` centred on `center`, `size` playfield units across.
    fn draw_image(&mut self, sprite: Sprite, center: Pos2, size: f32, alpha: f32);
    fn draw_text(&mut self, text: &str, center: Pos2, size: f32, alpha: f32);

    fn save(&mut self);
    fn restore(&mut self);
    fn translate(&mut self, offset: Pos2);
    fn scale(&mut self, factor: f32);
    fn rotate(&mut self, radians: f32);
    fn clip_rect(&mut self, min: Pos2, max: Pos2);

    /// Renders a slider body into an off-screen image under `id`. Returns
    /// `false` when the backend cannot, in which case bodies are stroked
    /// every frame.
    fn bake_path(&mut self, id: u64, points: &[Pos2], radius: f32) -> bool {
        let _ = (id, points, radius);
        false
    }

    fn draw_baked(&mut self, id: u64, alpha: f32) {
        let _ = (id, alpha);
    }
}

/// Output surface size in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 720.0,
        }
    }
}

impl Viewport {
    /// Uniform scale and offset that fit the playfield, centred, into the
    /// middle 80% of the viewport height.
    fn playfield_transform(&self) -> (f32, Pos2) {
        let scale = (self.height * 0.8 / PLAYFIELD_HEIGHT).min(self.width / PLAYFIELD_WIDTH);
        let offset = Pos2::new(
            (self.width - PLAYFIELD_WIDTH * scale) / 2.0,
            (self.height - PLAYFIELD_HEIGHT * scale) / 2.0,
        );

        (scale, offset)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub objects: usize,
    /// Objects that reached their hit time during this frame.
    pub armed: usize,
    pub baked_bodies: usize,
    pub stroked_bodies: usize,
}

/// Draws one frame of visible drawables.
#[derive(Debug, Default)]
pub struct FrameRenderer {
    viewport: Viewport,
    baked: HashSet<u64>,
    baked_generation: u64,
}

impl FrameRenderer {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            ..Self::default()
        }
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Slider bodies go first so every head sits on top of them; within each
    /// pass later objects are drawn beneath earlier ones.
    pub fn render(
        &mut self,
        set: &DrawableSet,
        visible: &[usize],
        time: f64,
        backend: &mut dyn RenderBackend,
    ) -> FrameStats {
        if set.generation() != self.baked_generation {
            self.baked.clear();
            self.baked_generation = set.generation();
        }

        let (scale, offset) = self.viewport.playfield_transform();
        backend.save();
        backend.translate(offset);
        backend.scale(scale);
        backend.clip_rect(Pos2::ZERO, Pos2::new(PLAYFIELD_WIDTH, PLAYFIELD_HEIGHT));

        let frame: Vec<(&Drawable, Visual)> = visible
            .iter()
            .rev()
            .filter_map(|&index| set.get(index))
            .map(|drawable| (drawable, drawable.visual(time)))
            .collect();

        let mut stats = FrameStats {
            objects: frame.len(),
            ..FrameStats::default()
        };

        for (drawable, visual) in &frame {
            if let Visual::Slider(slider) = visual {
                self.draw_body(set.generation(), drawable, slider, backend, &mut stats);
            }
        }

        for (drawable, visual) in &frame {
            let colour = combo_colour(drawable);

            match visual {
                Visual::Circle(circle) => draw_hit_circle(drawable, circle, colour, backend),
                Visual::Slider(slider) => draw_slider_parts(drawable, slider, colour, backend),
                Visual::Spinner(spinner) => draw_spinner(spinner, backend),
                Visual::Hold(hold) => draw_hold(drawable, hold, colour, backend),
            }
        }

        backend.restore();
        stats
    }

    fn draw_body(
        &mut self,
        generation: u64,
        drawable: &Drawable,
        visual: &SliderVisual,
        backend: &mut dyn RenderBackend,
        stats: &mut FrameStats,
    ) {
        let Some(geometry) = drawable.slider() else {
            return;
        };

        if visual.body_alpha <= 0.0 {
            return;
        }

        let id = (generation << 32) | drawable.index as u64;

        if self.baked.contains(&id)
            || backend.bake_path(id, geometry.path.points(), drawable.radius)
        {
            self.baked.insert(id);
            backend.draw_baked(id, visual.body_alpha);
            stats.baked_bodies += 1;
        } else {
            backend.stroke_path(
                geometry.path.points(),
                drawable.radius * 2.0,
                combo_colour(drawable).with_alpha(visual.body_alpha),
            );
            stats.stroked_bodies += 1;
        }
    }
}

fn combo_colour(drawable: &Drawable) -> Rgba {
    COMBO_COLOURS[drawable.combo.colour_index as usize % COMBO_COLOURS.len()]
}

fn draw_hit_circle(
    drawable: &Drawable,
    visual: &CircleVisual,
    colour: Rgba,
    backend: &mut dyn RenderBackend,
) {
    let position = drawable.position;
    let diameter = drawable.radius * 2.0;

    if visual.alpha > 0.0 {
        backend.draw_circle(
            position,
            drawable.radius * visual.scale,
            colour.with_alpha(visual.alpha),
        );
        backend.draw_image(
            Sprite::HitCircleOverlay,
            position,
            diameter * visual.scale,
            visual.alpha,
        );

        if let Some(number) = drawable.combo.number {
            backend.draw_text(&number.to_string(), position, drawable.radius * 0.8, visual.alpha);
        }
    }

    if visual.approach_alpha > 0.0 {
        backend.draw_image(
            Sprite::ApproachCircle,
            position,
            diameter * visual.approach_scale,
            visual.approach_alpha,
        );
    }

    if visual.flash_alpha > 0.0 {
        backend.draw_image(Sprite::HitFlash, position, diameter, visual.flash_alpha);
    }

    if visual.burst_alpha > 0.0 {
        backend.draw_image(
            Sprite::HitBurst,
            position,
            diameter * visual.burst_scale,
            visual.burst_alpha,
        );
    }
}

fn draw_slider_parts(
    drawable: &Drawable,
    visual: &SliderVisual,
    colour: Rgba,
    backend: &mut dyn RenderBackend,
) {
    let diameter = drawable.radius * 2.0;

    for tick in visual.ticks.iter().filter(|tick| tick.alpha > 0.0) {
        backend.draw_image(
            Sprite::SliderTick,
            tick.position,
            diameter * TICK_SIZE * tick.scale,
            tick.alpha,
        );
    }

    for arrow in visual.arrows.iter().filter(|arrow| arrow.alpha > 0.0) {
        backend.save();
        backend.translate(arrow.position);
        backend.rotate(arrow.rotation);
        backend.draw_image(Sprite::ReverseArrow, Pos2::ZERO, diameter * arrow.scale, arrow.alpha);
        backend.restore();
    }

    draw_hit_circle(drawable, &visual.head, colour, backend);

    if visual.ball_alpha > 0.0 {
        backend.draw_image(Sprite::SliderBall, visual.ball_position, diameter, visual.ball_alpha);
    }

    if visual.follow_alpha > 0.0 {
        backend.draw_image(
            Sprite::FollowCircle,
            visual.ball_position,
            diameter * FOLLOW_CIRCLE_SIZE * visual.follow_scale,
            visual.follow_alpha,
        );
    }
}

fn draw_spinner(visual: &SpinnerVisual, backend: &mut dyn RenderBackend) {
    if visual.alpha <= 0.0 {
        return;
    }

    let center = Pos2::center();

    backend.save();
    backend.translate(center);
    backend.rotate(visual.rotation);
    backend.draw_image(Sprite::Spinner, Pos2::ZERO, SPINNER_SIZE, visual.alpha);
    backend.restore();

    backend.draw_image(
        Sprite::SpinnerApproach,
        center,
        SPINNER_SIZE * visual.approach_scale,
        visual.alpha,
    );
}

fn draw_hold(
    drawable: &Drawable,
    visual: &HoldVisual,
    colour: Rgba,
    backend: &mut dyn RenderBackend,
) {
    if visual.body_alpha > 0.0 {
        let ring = drawable.radius * (1.0 + 0.25 * (1.0 - visual.progress));
        backend.draw_circle(drawable.position, ring, colour.with_alpha(visual.body_alpha * 0.5));
    }

    draw_hit_circle(drawable, &visual.head, colour, backend);
}

/// Backend that only counts the calls it receives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountingBackend {
    pub circles: usize,
    pub paths: usize,
    pub images: usize,
    pub texts: usize,
    pub baked: usize,
    pub baked_draws: usize,
    pub transforms: usize,
    pub depth: usize,
    pub max_depth: usize,
    /// Whether `bake_path` should succeed.
    pub offscreen: bool,
}

impl CountingBackend {
    pub fn with_offscreen() -> Self {
        Self {
            offscreen: true,
            ..Self::default()
        }
    }

    pub fn draw_calls(&self) -> usize {
        self.circles + self.paths + self.images + self.texts + self.baked_draws
    }
}

impl RenderBackend for CountingBackend {
    fn draw_circle(&mut self, _center: Pos2, _radius: f32, _colour: Rgba) {
        self.circles += 1;
    }

    fn stroke_path(&mut self, _points: &[Pos2], _width: f32, _colour: Rgba) {
        self.paths += 1;
    }

    fn draw_image(&mut self, _sprite: Sprite, _center: Pos2, _size: f32, _alpha: f32) {
        self.images += 1;
    }

    fn draw_text(&mut self, _text: &str, _center: Pos2, _size: f32, _alpha: f32) {
        self.texts += 1;
    }

    fn save(&mut self) {
        self.depth += 1;
        self.max_depth = self.max_depth.max(self.depth);
    }

    fn restore(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    fn translate(&mut self, _offset: Pos2) {
        self.transforms += 1;
    }

    fn scale(&mut self, _factor: f32) {
        self.transforms += 1;
    }

    fn rotate(&mut self, _radians: f32) {
        self.transforms += 1;
    }

    fn clip_rect(&mut self, _min: Pos2, _max: Pos2) {
        self.transforms += 1;
    }

    fn bake_path(&mut self, _id: u64, _points: &[Pos2], _radius: f32) -> bool {
        if self.offscreen {
            self.baked += 1;
        }

        self.offscreen
    }

    fn draw_baked(&mut self, _id: u64, _alpha: f32) {
        self.baked_draws += 1;
    }
}
