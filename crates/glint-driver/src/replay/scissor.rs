use crate::backend::{Extent, Scissor};
use crate::stream::ScissorRect;

/// Clamps edge-form `rect` to `area`. `None` when nothing remains.
pub(crate) fn clamp_scissor(rect: ScissorRect, area: Extent) -> Option<Scissor> {
    let w = i32::try_from(area.width).unwrap_or(i32::MAX);
    let h = i32::try_from(area.height).unwrap_or(i32::MAX);

    let left = rect.left.clamp(0, w);
    let right = rect.right.clamp(0, w);
    let top = rect.top.clamp(0, h);
    let bottom = rect.bottom.clamp(0, h);
    if right <= left || bottom <= top {
        return None;
    }

    Some(Scissor {
        x: left as u32,
        y: top as u32,
        width: (right - left) as u32,
        height: (bottom - top) as u32,
    })
}
