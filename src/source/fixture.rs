//! Built-in World Café session used when no real transcripts are available.

use super::TranscriptSource;
use crate::error::SourceError;
use crate::models::{SpeakerSegment, TranscriptionUnit};
use async_trait::async_trait;

fn segment(table: &str, speaker: u32, start: f64, end: f64, text: &str) -> SpeakerSegment {
    SpeakerSegment {
        speaker,
        start,
        end,
        text: text.to_string(),
        confidence: 0.92,
        table_id: table.to_string(),
        words: Vec::new(),
    }
}

fn unit(table: &str, segments: Vec<SpeakerSegment>) -> TranscriptionUnit {
    let full_text = segments
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    TranscriptionUnit {
        table_id: table.to_string(),
        full_text,
        segments,
        language: "en".to_string(),
        confidence: 0.92,
    }
}

/// Three tables, five speakers, roughly four minutes of conversation.
///
/// The data is fixed so that repeated runs produce identical results.
pub fn world_cafe_fixture() -> Vec<TranscriptionUnit> {
    vec![
        unit(
            "table-1",
            vec![
                segment("table-1", 0, 0.0, 18.0, "Welcome everyone. Our question today is how the library could serve families better in the evenings."),
                segment("table-1", 1, 18.5, 30.0, "I wonder if longer opening hours on Thursdays would help working parents."),
                segment("table-1", 0, 29.2, 52.0, "Well actually, opening hours are not the real issue. Let me explain, the real issue is the budget for staff."),
                segment("table-1", 1, 52.5, 60.0, "That is a good point, could you say more about the staffing?"),
                segment("table-1", 0, 60.5, 88.0, "As I said, the budget decides everything. Anyway, let's get back to the budget question."),
            ],
        ),
        unit(
            "table-2",
            vec![
                segment("table-2", 2, 90.0, 112.0, "Building on what the first table shared, maybe we could run a homework club with volunteers."),
                segment("table-2", 3, 112.4, 126.0, "I agree with that, and perhaps the teenagers could help the younger kids."),
                segment("table-2", 2, 125.5, 140.0, "What do you think about asking the school to advertise it?"),
                segment("table-2", 3, 140.6, 150.0, "I'm curious whether the school newsletter reaches every family."),
            ],
        ),
        unit(
            "table-3",
            vec![
                segment("table-3", 4, 152.0, 170.0, "At our table we talked about transport, because some families cannot get here after dark."),
                segment("table-3", 0, 170.5, 196.0, "Moving on, the main thing is funding. It's simple, without money none of this happens."),
                segment("table-3", 4, 196.5, 204.0, "Maybe a shared ride scheme could work."),
                segment("table-3", 0, 203.0, 232.0, "Let's focus on the budget. More importantly, the council has to commit before anything else."),
                segment("table-3", 4, 232.5, 240.0, "Okay."),
            ],
        ),
    ]
}

/// Serves `world_cafe_fixture()` for every session id.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureSource;

#[async_trait]
impl TranscriptSource for FixtureSource {
    async fn get_transcriptions(
        &self,
        _session_id: &str,
    ) -> Result<Vec<TranscriptionUnit>, SourceError> {
        Ok(world_cafe_fixture())
    }
}
