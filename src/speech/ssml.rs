//! SSML document generation for plain-text requests

use crate::{Result, SpeakError};
use xml::writer::XmlEvent;
use xml::{EmitterConfig, EventWriter};

const SSML_NAMESPACE: &str = "http://www.w3.org/2001/10/synthesis";

/// Wrap plain text in a `<speak>` document that selects the given voice
///
/// The text is escaped, so markup characters in it are spoken literally.
pub fn text_to_ssml(text: &str, language: &str, voice_name: &str) -> Result<String> {
    let mut writer = EventWriter::new_with_config(
        Vec::new(),
        EmitterConfig::new().write_document_declaration(false),
    );

    write_event(
        &mut writer,
        XmlEvent::start_element("speak")
            .default_ns(SSML_NAMESPACE)
            .attr("version", "1.0")
            .attr("xml:lang", language)
            .into(),
    )?;
    write_event(
        &mut writer,
        XmlEvent::start_element("voice").attr("name", voice_name).into(),
    )?;
    write_event(&mut writer, XmlEvent::characters(text))?;
    write_event(&mut writer, XmlEvent::end_element().into())?;
    write_event(&mut writer, XmlEvent::end_element().into())?;

    String::from_utf8(writer.into_inner())
        .map_err(|e| SpeakError::Speak(format!("SSML is not valid UTF-8: {}", e)))
}

fn write_event(writer: &mut EventWriter<Vec<u8>>, event: XmlEvent) -> Result<()> {
    writer
        .write(event)
        .map_err(|e| SpeakError::Speak(format!("Failed to build SSML: {}", e)))
}
