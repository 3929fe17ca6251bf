use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tracing::debug;

use zubi_shared::{ToolCall, ToolDirective};

/// How long a triggered effect stays visible before it expires.
pub const EFFECT_LIFETIME: Duration = Duration::from_secs(3);

/// Rendering surface for visual effects. Implementations must not
/// block; expiry arrives on a background task and must tolerate ids of
/// effects that are already gone.
pub trait EffectSurface: Send + Sync + 'static {
    /// Show an effect; the returned id is passed back to `expire`.
    fn apply(&self, effect: &ToolDirective) -> u64;
    fn expire(&self, effect_id: u64);
}

/// Turns tool directives from the assistant into fire-and-forget,
/// time-boxed visual effects. Unknown tool names are ignored. Effects
/// are neither tracked nor awaited, so rapid consecutive calls may
/// visually overlap. Spawned expiry tasks hold only the surface handle,
/// never conversation state, so a mid-effect reset leaves nothing
/// dangling.
#[derive(Clone)]
pub struct ToolDispatcher {
    surface: Arc<dyn EffectSurface>,
}

impl ToolDispatcher {
    pub fn new(surface: Arc<dyn EffectSurface>) -> Self {
        Self { surface }
    }

    pub fn execute(&self, call: Option<&ToolCall>) {
        let Some(call) = call else { return };
        let Some(directive) = ToolDirective::from_call(call) else {
            debug!("ignoring unknown tool {:?}", call.name);
            return;
        };

        let surface = Arc::clone(&self.surface);
        tokio::spawn(async move {
            let effect_id = surface.apply(&directive);
            tokio::time::sleep(EFFECT_LIFETIME).await;
            surface.expire(effect_id);
        });
    }
}

/// Renders effects as terminal lines. Stars accumulate in a counter the
/// way the reward HUD does; only `reset` clears it.
#[derive(Default)]
pub struct TerminalSurface {
    next_id: AtomicU64,
    stars: AtomicU64,
}

impl TerminalSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn star_count(&self) -> u64 {
        self.stars.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.stars.store(0, Ordering::Relaxed);
    }
}

impl EffectSurface for TerminalSurface {
    fn apply(&self, effect: &ToolDirective) -> u64 {
        match effect {
            ToolDirective::HighlightObject { label } => println!("   👉 {label}"),
            ToolDirective::AddRewardStar { reason } => {
                let stars = self.stars.fetch_add(1, Ordering::Relaxed) + 1;
                println!("   ⭐ {reason} (stars: {stars})");
            }
            ToolDirective::ShowEmojiReaction { emoji } => {
                println!("   {emoji} {emoji} {emoji}");
            }
        }
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn expire(&self, _effect_id: u64) {
        // Printed lines cannot be unrendered; stars persist by contract.
    }
}
