//! `.xges` project files.
//!
//! The writer emits the subset of the GES XML formatter's layout that the
//! in-memory backend can describe: project metadata, assets, tracks, layers,
//! clips with their per-track sources and effects. The reader accepts files
//! written by either backend and keeps only what the summary needs.

use std::path::Path;

use clipforge_common::{ClipforgeError, ClipforgeResult};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use serde::Serialize;

/// Errors raised while writing or reading project XML.
#[derive(Debug, thiserror::Error)]
pub enum XgesError {
    #[error("failed to write project XML: {0}")]
    Write(String),

    #[error("malformed project XML: {0}")]
    Read(String),

    #[error("invalid `{attribute}` on <{element}>: {value:?}")]
    InvalidAttribute {
        element: &'static str,
        attribute: &'static str,
        value: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct XgesProject {
    /// Project-level metadata as a GstStructure string.
    pub metadatas: Option<String>,
    pub assets: Vec<XgesAsset>,
    pub tracks: Vec<XgesTrack>,
    pub layers: Vec<XgesLayer>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct XgesAsset {
    pub id: String,
    pub extractable_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct XgesTrack {
    pub track_id: u32,
    pub track_type: u32,
    pub caps: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct XgesLayer {
    pub priority: u32,
    pub auto_transition: bool,
    pub clips: Vec<XgesClip>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct XgesClip {
    pub id: u32,
    pub asset_id: String,
    pub type_name: String,
    pub track_types: u32,
    pub start: u64,
    pub inpoint: u64,
    pub duration: u64,
    pub sources: Vec<XgesSource>,
    /// Effect bin descriptions in attachment order.
    pub effects: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct XgesSource {
    pub track_id: u32,
    pub children_properties: String,
}

/// Serialize a project to xges XML.
pub fn write_project(project: &XgesProject) -> Result<String, XgesError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    emit(
        &mut writer,
        Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
    )?;

    let mut ges = BytesStart::new("ges");
    ges.push_attribute(("version", "0.7"));
    emit(&mut writer, Event::Start(ges))?;

    let mut proj = BytesStart::new("project");
    proj.push_attribute(("properties", "properties;"));
    proj.push_attribute((
        "metadatas",
        project.metadatas.as_deref().unwrap_or("metadatas;"),
    ));
    emit(&mut writer, Event::Start(proj))?;

    emit(&mut writer, Event::Start(BytesStart::new("ressources")))?;
    for asset in &project.assets {
        let mut el = BytesStart::new("asset");
        el.push_attribute(("id", asset.id.as_str()));
        el.push_attribute(("extractable-type-name", asset.extractable_type.as_str()));
        el.push_attribute(("properties", "properties;"));
        el.push_attribute(("metadatas", "metadatas;"));
        emit(&mut writer, Event::Empty(el))?;
    }
    emit(&mut writer, Event::End(BytesEnd::new("ressources")))?;

    let mut timeline = BytesStart::new("timeline");
    timeline.push_attribute(("properties", "properties;"));
    emit(&mut writer, Event::Start(timeline))?;

    for track in &project.tracks {
        let mut el = BytesStart::new("track");
        el.push_attribute(("caps", track.caps.as_str()));
        el.push_attribute(("track-type", track.track_type.to_string().as_str()));
        el.push_attribute(("track-id", track.track_id.to_string().as_str()));
        el.push_attribute(("properties", "properties;"));
        emit(&mut writer, Event::Empty(el))?;
    }

    for layer in &project.layers {
        let mut el = BytesStart::new("layer");
        el.push_attribute(("priority", layer.priority.to_string().as_str()));
        let properties = format!(
            "properties, auto-transition=(boolean){};",
            layer.auto_transition
        );
        el.push_attribute(("properties", properties.as_str()));
        emit(&mut writer, Event::Start(el))?;

        for clip in &layer.clips {
            write_clip(&mut writer, clip, layer.priority)?;
        }

        emit(&mut writer, Event::End(BytesEnd::new("layer")))?;
    }

    emit(&mut writer, Event::End(BytesEnd::new("timeline")))?;
    emit(&mut writer, Event::End(BytesEnd::new("project")))?;
    emit(&mut writer, Event::End(BytesEnd::new("ges")))?;

    String::from_utf8(writer.into_inner()).map_err(|e| XgesError::Write(e.to_string()))
}

fn write_clip(
    writer: &mut Writer<Vec<u8>>,
    clip: &XgesClip,
    layer_priority: u32,
) -> Result<(), XgesError> {
    let mut el = BytesStart::new("clip");
    el.push_attribute(("id", clip.id.to_string().as_str()));
    el.push_attribute(("asset-id", clip.asset_id.as_str()));
    el.push_attribute(("type-name", clip.type_name.as_str()));
    el.push_attribute(("layer-priority", layer_priority.to_string().as_str()));
    el.push_attribute(("track-types", clip.track_types.to_string().as_str()));
    el.push_attribute(("start", clip.start.to_string().as_str()));
    el.push_attribute(("duration", clip.duration.to_string().as_str()));
    el.push_attribute(("inpoint", clip.inpoint.to_string().as_str()));
    el.push_attribute(("rate", "0"));
    el.push_attribute(("properties", "properties;"));
    emit(writer, Event::Start(el))?;

    for source in &clip.sources {
        let mut el = BytesStart::new("source");
        el.push_attribute(("track-id", source.track_id.to_string().as_str()));
        el.push_attribute(("children-properties", source.children_properties.as_str()));
        emit(writer, Event::Empty(el))?;
    }

    for effect in &clip.effects {
        let mut el = BytesStart::new("effect");
        el.push_attribute(("asset-id", effect.as_str()));
        el.push_attribute(("clip-id", clip.id.to_string().as_str()));
        el.push_attribute(("type-name", "GESEffect"));
        el.push_attribute(("properties", "properties;"));
        emit(writer, Event::Empty(el))?;
    }

    emit(writer, Event::End(BytesEnd::new("clip")))
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), XgesError> {
    writer
        .write_event(event)
        .map_err(|e| XgesError::Write(e.to_string()))
}

/// Parse xges XML.
///
/// Elements are attached to the most recently opened parent (clips to the
/// last layer, sources and effects to the last clip), which matches how
/// both GES and [`write_project`] nest them.
pub fn read_project(text: &str) -> Result<XgesProject, XgesError> {
    let mut reader = Reader::from_str(text);
    let mut project = XgesProject::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => read_element(&e, &mut project)?,
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(XgesError::Read(e.to_string())),
        }
    }

    Ok(project)
}

fn read_element(e: &BytesStart<'_>, project: &mut XgesProject) -> Result<(), XgesError> {
    match e.name().as_ref() {
        b"project" => {
            project.metadatas = attribute(e, "metadatas")?;
        }
        b"asset" => {
            project.assets.push(XgesAsset {
                id: attribute(e, "id")?.unwrap_or_default(),
                extractable_type: attribute(e, "extractable-type-name")?.unwrap_or_default(),
            });
        }
        b"track" => {
            project.tracks.push(XgesTrack {
                track_id: number(e, "track", "track-id")?.unwrap_or_default(),
                track_type: number(e, "track", "track-type")?.unwrap_or_default(),
                caps: attribute(e, "caps")?.unwrap_or_default(),
            });
        }
        b"layer" => {
            let auto_transition = attribute(e, "properties")?
                .is_some_and(|p| p.contains("auto-transition=(boolean)true"));
            project.layers.push(XgesLayer {
                priority: number(e, "layer", "priority")?.unwrap_or_default(),
                auto_transition,
                clips: Vec::new(),
            });
        }
        b"clip" => {
            let clip = XgesClip {
                id: number(e, "clip", "id")?.unwrap_or_default(),
                asset_id: attribute(e, "asset-id")?.unwrap_or_default(),
                type_name: attribute(e, "type-name")?.unwrap_or_default(),
                track_types: number(e, "clip", "track-types")?.unwrap_or_default(),
                start: number(e, "clip", "start")?.unwrap_or_default(),
                inpoint: number(e, "clip", "inpoint")?.unwrap_or_default(),
                duration: number(e, "clip", "duration")?.unwrap_or_default(),
                sources: Vec::new(),
                effects: Vec::new(),
            };
            let layer = project
                .layers
                .last_mut()
                .ok_or_else(|| XgesError::Read("<clip> outside of a <layer>".into()))?;
            layer.clips.push(clip);
        }
        b"source" => {
            let source = XgesSource {
                track_id: number(e, "source", "track-id")?.unwrap_or_default(),
                children_properties: attribute(e, "children-properties")?.unwrap_or_default(),
            };
            if let Some(clip) = last_clip(project) {
                clip.sources.push(source);
            }
        }
        b"effect" => {
            let name = attribute(e, "asset-id")?.unwrap_or_default();
            if let Some(clip) = last_clip(project) {
                clip.effects.push(name);
            }
        }
        _ => {}
    }
    Ok(())
}

fn last_clip(project: &mut XgesProject) -> Option<&mut XgesClip> {
    project.layers.last_mut()?.clips.last_mut()
}

fn attribute(e: &BytesStart<'_>, name: &str) -> Result<Option<String>, XgesError> {
    for attr in e.attributes() {
        let attr = attr.map_err(|err| XgesError::Read(err.to_string()))?;
        if attr.key.as_ref() == name.as_bytes() {
            let value = attr
                .unescape_value()
                .map_err(|err| XgesError::Read(err.to_string()))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn number<T: std::str::FromStr>(
    e: &BytesStart<'_>,
    element: &'static str,
    name: &'static str,
) -> Result<Option<T>, XgesError> {
    attribute(e, name)?
        .map(|value| {
            value
                .trim()
                .parse::<T>()
                .map_err(|_| XgesError::InvalidAttribute {
                    element,
                    attribute: name,
                    value,
                })
        })
        .transpose()
}

/// Structural summary of a saved project.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProjectSummary {
    pub layers: Vec<LayerSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerSummary {
    pub priority: u32,
    pub clips: Vec<ClipSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClipSummary {
    pub asset_id: String,
    pub start: u64,
    pub inpoint: u64,
    pub duration: u64,
    pub effects: Vec<String>,
}

impl ProjectSummary {
    pub fn clip_count(&self) -> usize {
        self.layers.iter().map(|layer| layer.clips.len()).sum()
    }
}

impl From<XgesProject> for ProjectSummary {
    fn from(project: XgesProject) -> Self {
        let layers = project
            .layers
            .into_iter()
            .map(|layer| LayerSummary {
                priority: layer.priority,
                clips: layer
                    .clips
                    .into_iter()
                    .map(|clip| ClipSummary {
                        asset_id: clip.asset_id,
                        start: clip.start,
                        inpoint: clip.inpoint,
                        duration: clip.duration,
                        effects: clip.effects,
                    })
                    .collect(),
            })
            .collect();
        Self { layers }
    }
}

/// Read a project file from disk and summarize it.
pub fn read_project_summary(path: impl AsRef<Path>) -> ClipforgeResult<ProjectSummary> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    let project = read_project(&text).map_err(|e| ClipforgeError::parse(path, e.to_string()))?;
    Ok(project.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> XgesProject {
        XgesProject {
            metadatas: Some("metadatas, name=(string)\"t\";".into()),
            assets: vec![XgesAsset {
                id: "file:///m/a.png".into(),
                extractable_type: "GESUriClip".into(),
            }],
            tracks: vec![XgesTrack {
                track_id: 0,
                track_type: 4,
                caps: "video/x-raw(ANY)".into(),
            }],
            layers: vec![XgesLayer {
                priority: 0,
                auto_transition: true,
                clips: vec![XgesClip {
                    id: 0,
                    asset_id: "file:///m/a.png".into(),
                    type_name: "GESUriClip".into(),
                    track_types: 4,
                    start: 0,
                    inpoint: 0,
                    duration: 2_000_000_000,
                    sources: vec![XgesSource {
                        track_id: 0,
                        children_properties: "properties, posx=(int)10;".into(),
                    }],
                    effects: vec!["agingtv".into()],
                }],
            }],
        }
    }

    #[test]
    fn test_written_project_reads_back() {
        let xml = write_project(&sample()).unwrap();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));

        let parsed = read_project(&xml).unwrap();
        assert_eq!(parsed.layers.len(), 1);
        assert!(parsed.layers[0].auto_transition);
        let clip = &parsed.layers[0].clips[0];
        assert_eq!(clip.duration, 2_000_000_000);
        assert_eq!(clip.effects, vec!["agingtv".to_string()]);
        assert_eq!(clip.sources[0].children_properties, "properties, posx=(int)10;");
        assert_eq!(parsed.assets, sample().assets);
    }

    #[test]
    fn test_reads_ges_formatter_output() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<ges version='0.7'>
  <project properties='properties;' metadatas='metadatas;'>
    <ressources>
      <asset id='file:///m/b.webm' extractable-type-name='GESUriClip' properties='properties;' metadatas='metadatas;' />
    </ressources>
    <timeline properties='properties;' metadatas='metadatas;'>
      <track caps='video/x-raw(ANY)' track-type='4' track-id='0' properties='properties;' metadatas='metadatas;'/>
      <track caps='audio/x-raw(ANY)' track-type='2' track-id='1' properties='properties;' metadatas='metadatas;'/>
      <layer priority='0' properties='properties, auto-transition=(boolean)false;' metadatas='metadatas;'>
        <clip id='0' asset-id='file:///m/b.webm' type-name='GESUriClip' layer-priority='0' track-types='6' start='1000000000' duration='4000000000' inpoint='3000000000' rate='0' properties='properties;' >
          <source track-id='1' children-properties='properties, volume=(double)0.5;'>
          </source>
          <effect asset-id='agingtv' clip-id='0' type-name='GESEffect' track-type='4' track-id='0' properties='properties;' metadatas='metadatas;' children-properties='properties;'>
          </effect>
        </clip>
      </layer>
      <layer priority='1' properties='properties;' metadatas='metadatas;'>
      </layer>
    </timeline>
  </project>
</ges>"#;
        let project = read_project(xml).unwrap();
        assert_eq!(project.tracks.len(), 2);
        assert_eq!(project.layers.len(), 2);

        let summary = ProjectSummary::from(project);
        assert_eq!(summary.clip_count(), 1);
        let clip = &summary.layers[0].clips[0];
        assert_eq!(
            (clip.start, clip.inpoint, clip.duration),
            (1_000_000_000, 3_000_000_000, 4_000_000_000)
        );
        assert_eq!(clip.effects, vec!["agingtv".to_string()]);
        assert_eq!(summary.layers[1].priority, 1);
    }

    #[test]
    fn test_invalid_number_is_reported() {
        let xml = "<ges><project><timeline><layer priority='x'/></timeline></project></ges>";
        let err = read_project(xml).unwrap_err();
        assert!(matches!(
            err,
            XgesError::InvalidAttribute {
                attribute: "priority",
                ..
            }
        ));
    }

    #[test]
    fn test_clip_outside_layer_is_rejected() {
        let xml = "<ges><clip id='0' asset-id='a'/></ges>";
        assert!(read_project(xml).is_err());
    }
}
