//! In-memory .pptx fixtures for tests.
//!
//! The standard fixture has one slide master with eleven layouts (the first
//! named "Title Slide"), a theme, two slides (the first with nine shapes and an
//! embedded picture) and core properties.

use crate::ooxml::opc::constants::{content_type as ct, relationship_type as rt};
use std::io::{Cursor, Write};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// A 1x1 PNG.
pub const PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F, 0x15, 0xC4,
    0x89, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00, 0x01, 0x00, 0x00,
    0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE,
    0x42, 0x60, 0x82,
];

pub const LAYOUT_COUNT: usize = 11;

const DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;
const NS: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;
const REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const RT: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

fn sp_tree(shapes: &str) -> String {
    format!(
        r#"<p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>{}</p:spTree>"#,
        shapes
    )
}

fn shape(id: usize) -> String {
    format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="Shape {id}"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr><p:spPr/></p:sp>"#
    )
}

/// `p:presentation` with one master (`rId1`) and slides related as `rId2..`.
pub fn presentation_xml(slides: usize) -> String {
    let ids: String = (0..slides)
        .map(|i| format!(r#"<p:sldId id="{}" r:id="rId{}"/>"#, 256 + i, i + 2))
        .collect();
    presentation_xml_with_ids(&ids)
}

fn presentation_xml_with_ids(sld_ids: &str) -> String {
    let lst = if sld_ids.is_empty() {
        String::new()
    } else {
        format!("<p:sldIdLst>{}</p:sldIdLst>", sld_ids)
    };
    format!(
        r#"{DECL}
<p:presentation {NS}><p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst>{lst}<p:sldSz cx="9144000" cy="6858000"/><p:notesSz cx="6858000" cy="9144000"/></p:presentation>"#
    )
}

pub fn master_xml() -> String {
    let ids: String = (1..=LAYOUT_COUNT)
        .map(|i| format!(r#"<p:sldLayoutId id="{}" r:id="rId{}"/>"#, 2147483648usize + i, i))
        .collect();
    format!(
        r#"{DECL}
<p:sldMaster {NS}><p:cSld>{}</p:cSld><p:sldLayoutIdLst>{ids}</p:sldLayoutIdLst></p:sldMaster>"#,
        sp_tree(&shape(2))
    )
}

pub fn layout_xml(name: &str) -> String {
    format!(
        r#"{DECL}
<p:sldLayout {NS}><p:cSld name="{name}">{}</p:cSld></p:sldLayout>"#,
        sp_tree(&shape(2))
    )
}

/// A slide with `shapes` plain shapes.
pub fn slide_xml(shapes: usize) -> String {
    let body: String = (0..shapes).map(|i| shape(i + 2)).collect();
    format!(
        r#"{DECL}
<p:sld {NS}><p:cSld>{}</p:cSld></p:sld>"#,
        sp_tree(&body)
    )
}

fn picture_slide_xml() -> String {
    let mut body: String = (0..8).map(|i| shape(i + 2)).collect();
    body.push_str(r#"<p:pic><p:nvPicPr><p:cNvPr id="10" name="Picture 9"/><p:cNvPicPr/><p:nvPr/></p:nvPicPr><p:blipFill><a:blip r:embed="rId2"/></p:blipFill><p:spPr/></p:pic>"#);
    format!(
        r#"{DECL}
<p:sld {NS}><p:cSld>{}</p:cSld></p:sld>"#,
        sp_tree(&body)
    )
}

fn rels(entries: &[(&str, &str, &str)]) -> String {
    let body: String = entries
        .iter()
        .map(|(id, reltype, target)| {
            let reltype = if reltype.contains("://") {
                reltype.to_string()
            } else {
                format!("{RT}/{reltype}")
            };
            format!(r#"<Relationship Id="{id}" Type="{reltype}" Target="{target}"/>"#)
        })
        .collect();
    format!("{DECL}\n<Relationships xmlns=\"{REL_NS}\">{body}</Relationships>")
}

fn content_types() -> String {
    let mut overrides = vec![
        ("/ppt/presentation.xml".to_string(), ct::PML_PRESENTATION_MAIN),
        ("/ppt/slideMasters/slideMaster1.xml".to_string(), ct::PML_SLIDE_MASTER),
        ("/ppt/slides/slide1.xml".to_string(), ct::PML_SLIDE),
        ("/ppt/slides/slide2.xml".to_string(), ct::PML_SLIDE),
        ("/ppt/theme/theme1.xml".to_string(), ct::OFC_THEME),
        ("/docProps/core.xml".to_string(), ct::OPC_CORE_PROPERTIES),
    ];
    for i in 1..=LAYOUT_COUNT {
        overrides.push((format!("/ppt/slideLayouts/slideLayout{}.xml", i), ct::PML_SLIDE_LAYOUT));
    }
    let body: String = overrides
        .iter()
        .map(|(partname, content_type)| {
            format!(r#"<Override PartName="{partname}" ContentType="{content_type}"/>"#)
        })
        .collect();
    format!(
        r#"{DECL}
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="{}"/><Default Extension="xml" ContentType="{}"/><Default Extension="png" ContentType="{}"/>{body}</Types>"#,
        ct::OPC_RELATIONSHIPS,
        ct::XML,
        ct::PNG
    )
}

/// The archive members of the standard fixture, in write order.
///
/// `reversed` lists `slide2.xml` before `slide1.xml` in the slide id list.
pub fn entries(reversed: bool) -> Vec<(String, Vec<u8>)> {
    let mut out: Vec<(String, String)> = vec![
        ("[Content_Types].xml".into(), content_types()),
        (
            "_rels/.rels".into(),
            rels(&[
                ("rId1", "officeDocument", "ppt/presentation.xml"),
                ("rId2", rt::CORE_PROPERTIES, "docProps/core.xml"),
            ]),
        ),
        (
            "docProps/core.xml".into(),
            format!(
                r#"{DECL}
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/"><dc:title>Fixture Deck</dc:title><cp:revision>3</cp:revision></cp:coreProperties>"#
            ),
        ),
    ];

    let sld_ids = if reversed {
        r#"<p:sldId id="256" r:id="rId3"/><p:sldId id="257" r:id="rId2"/>"#
    } else {
        r#"<p:sldId id="256" r:id="rId2"/><p:sldId id="257" r:id="rId3"/>"#
    };
    out.push(("ppt/presentation.xml".into(), presentation_xml_with_ids(sld_ids)));
    out.push((
        "ppt/_rels/presentation.xml.rels".into(),
        rels(&[
            ("rId1", "slideMaster", "slideMasters/slideMaster1.xml"),
            ("rId2", "slide", "slides/slide1.xml"),
            ("rId3", "slide", "slides/slide2.xml"),
            ("rId4", "theme", "theme/theme1.xml"),
        ]),
    ));

    out.push(("ppt/slideMasters/slideMaster1.xml".into(), master_xml()));
    let mut master_rels: Vec<(String, &str, String)> = (1..=LAYOUT_COUNT)
        .map(|i| (format!("rId{}", i), "slideLayout", format!("../slideLayouts/slideLayout{}.xml", i)))
        .collect();
    master_rels.push((format!("rId{}", LAYOUT_COUNT + 1), "theme", "../theme/theme1.xml".into()));
    let master_rels: Vec<(&str, &str, &str)> = master_rels
        .iter()
        .map(|(id, reltype, target)| (id.as_str(), *reltype, target.as_str()))
        .collect();
    out.push(("ppt/slideMasters/_rels/slideMaster1.xml.rels".into(), rels(&master_rels)));

    for i in 1..=LAYOUT_COUNT {
        let name = if i == 1 { "Title Slide".to_string() } else { format!("Layout {}", i) };
        out.push((format!("ppt/slideLayouts/slideLayout{}.xml", i), layout_xml(&name)));
        out.push((
            format!("ppt/slideLayouts/_rels/slideLayout{}.xml.rels", i),
            rels(&[("rId1", "slideMaster", "../slideMasters/slideMaster1.xml")]),
        ));
    }

    out.push(("ppt/slides/slide1.xml".into(), picture_slide_xml()));
    out.push((
        "ppt/slides/_rels/slide1.xml.rels".into(),
        rels(&[
            ("rId1", "slideLayout", "../slideLayouts/slideLayout1.xml"),
            ("rId2", "image", "../media/image1.png"),
        ]),
    ));
    out.push(("ppt/slides/slide2.xml".into(), slide_xml(1)));
    out.push((
        "ppt/slides/_rels/slide2.xml.rels".into(),
        rels(&[("rId1", "slideLayout", "../slideLayouts/slideLayout2.xml")]),
    ));

    out.push((
        "ppt/theme/theme1.xml".into(),
        format!(r#"{DECL}
<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="Office Theme"/>"#),
    ));

    let mut members: Vec<(String, Vec<u8>)> = out
        .into_iter()
        .map(|(name, xml)| (name, xml.into_bytes()))
        .collect();
    members.push(("ppt/media/image1.png".into(), PNG.to_vec()));
    members
}

/// Zip archive members into package bytes.
pub fn zip(entries: &[(String, Vec<u8>)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, data) in entries {
        writer.start_file(name.as_str(), options).unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// The standard fixture as .pptx bytes.
pub fn pptx_bytes() -> Vec<u8> {
    zip(&entries(false))
}

/// The standard fixture with the two slides in reverse presentation order.
pub fn pptx_bytes_reversed() -> Vec<u8> {
    zip(&entries(true))
}
