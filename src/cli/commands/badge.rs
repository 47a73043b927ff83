//! Badge command - show the icon a rating maps to

use crate::cli::args::BadgeArgs;
use crate::error::OverlayResult;
use crate::overlay::{Badge, FALLBACK_ICON};
use crate::ui::{self, UiContext};

/// Execute the badge command
pub async fn execute(args: BadgeArgs) -> OverlayResult<()> {
    let ctx = UiContext::detect();
    let badge = Badge::for_rating(&args.rating);

    ui::key_value(&ctx, "rating", badge.rating.trim());
    ui::key_value(&ctx, "icon", &badge.icon);
    ui::key_value(&ctx, "src", &badge.src());
    ui::key_value(&ctx, "class", badge.class());
    ui::key_value(&ctx, "style", badge.inline_style());

    if badge.icon == FALLBACK_ICON {
        ui::remark(&ctx, "Unrecognized rating code; using the not-rated icon");
    }

    Ok(())
}
