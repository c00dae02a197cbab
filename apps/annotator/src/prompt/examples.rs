use crate::codec::template::Template;
use crate::codec::{self, CodecError};
use crate::models::{Document, OutputFormat, OutputFormatType};

/// Renders few-shot examples: each document through `example_template` with
/// `INPUT` = its text and `OUTPUT` = its serialization, joined by a blank line.
pub fn render_examples(
    examples: &[Document],
    format: &OutputFormat,
    kind: OutputFormatType,
    example_template: &str,
) -> Result<String, CodecError> {
    let template = Template::compile(example_template);

    let mut blocks = Vec::with_capacity(examples.len());
    for document in examples {
        let output = codec::serialize(document, format, kind)?;
        blocks.push(template.render_with(&[
            ("INPUT", document.text.as_str()),
            ("OUTPUT", output.as_str()),
        ]));
    }

    Ok(blocks.join("\n\n"))
}
