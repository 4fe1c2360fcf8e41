//! Helpers over the `p:presentation` root element.
//!
//! The slide id list (`p:sldIdLst`) is the authority for slide order; the
//! master id list (`p:sldMasterIdLst`) orders the slide masters.

use crate::ooxml::opc::error::{OpcError, Result};
use crate::ooxml::oxml::element::Element;
use std::collections::HashSet;

/// Smallest id a `p:sldId` may carry.
pub const MIN_SLIDE_ID: u32 = 256;

/// Largest id a `p:sldId` may carry.
pub const MAX_SLIDE_ID: u32 = 2_147_483_647;

/// Children of `p:presentation` that precede `p:sldIdLst` in schema order.
const SLD_ID_LST_PREDECESSORS: &[&str] =
    &["p:sldMasterIdLst", "p:notesMasterIdLst", "p:handoutMasterIdLst"];

/// One `p:sldId` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideId {
    pub id: u32,
    pub r_id: String,
}

fn parse_id(value: Option<&str>) -> u32 {
    value
        .and_then(|v| atoi_simd::parse::<u32, false, false>(v.as_bytes()).ok())
        .unwrap_or(0)
}

/// The `p:sldId` entries in document order. Entries without `r:id` are skipped.
pub fn slide_ids(presentation: &Element) -> Vec<SlideId> {
    presentation
        .find("p:sldIdLst")
        .map(|lst| {
            lst.find_all("p:sldId")
                .filter_map(|sld_id| {
                    sld_id.attr("r:id").map(|r_id| SlideId {
                        id: parse_id(sld_id.attr("id")),
                        r_id: r_id.to_string(),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

/// The `r:id` of each `p:sldMasterId`, in document order.
pub fn slide_master_r_ids(presentation: &Element) -> Vec<String> {
    presentation
        .find("p:sldMasterIdLst")
        .map(|lst| {
            lst.find_all("p:sldMasterId")
                .filter_map(|e| e.attr("r:id").map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// Get `p:sldIdLst`, inserting an empty one in schema position if absent.
fn get_or_add_slide_id_list(presentation: &mut Element) -> &mut Element {
    presentation.get_or_insert_after_any("p:sldIdLst", SLD_ID_LST_PREDECESSORS)
}

/// One more than the largest id in use, or the lowest free id once the
/// largest reaches [`MAX_SLIDE_ID`].
fn next_slide_id(used: &[u32]) -> Option<u32> {
    let max = used.iter().copied().max().unwrap_or(0);
    if max < MAX_SLIDE_ID {
        return Some((max + 1).max(MIN_SLIDE_ID));
    }
    let used: HashSet<u32> = used.iter().copied().collect();
    (MIN_SLIDE_ID..=MAX_SLIDE_ID).find(|id| !used.contains(id))
}

/// Append a `p:sldId` referencing `r_id` and return the id assigned to it.
///
/// The id is one more than the largest id present, and never below 256.
pub fn add_slide_id(presentation: &mut Element, r_id: &str) -> Result<u32> {
    let lst = get_or_add_slide_id_list(presentation);
    let used: Vec<u32> = lst.find_all("p:sldId").map(|e| parse_id(e.attr("id"))).collect();
    let id = next_slide_id(&used)
        .ok_or_else(|| OpcError::XmlError("p:sldIdLst has no unused slide id".to_string()))?;
    lst.append(
        Element::new("p:sldId")
            .with_attr("id", &id.to_string())
            .with_attr("r:id", r_id),
    );
    Ok(id)
}
