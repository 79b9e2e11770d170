//! Property tests for the tolerant response-block parser: across randomly
//! generated progress payloads wrapped in single-quoted, trailing-comma'd
//! JSON (the shape assistants actually produce), recovery should always
//! land on the same field values as the clean encoding.

use proptest::prelude::*;
use swarmhost::parser::{parse_multiple, PhasePayload};

fn messy_progress_block(task_id: &str, progress_percent: u8, current_action: &str) -> String {
    format!(
        "<<<ORCHESTRATOR_RESPONSE>>>\n\
         {{'phase': 'progress', 'data': {{'task_id': '{task_id}', 'status': 'running', \
         'progress_percent': {progress_percent}, 'current_action': '{current_action}',}}}}\n\
         <<<END_ORCHESTRATOR_RESPONSE>>>"
    )
}

proptest! {
    #[test]
    fn recovers_single_quoted_trailing_comma_progress_blocks(
        task_id in "[a-z][a-z0-9]{0,7}",
        progress_percent in 0u8..=100,
        current_action in "[a-z ]{1,16}",
    ) {
        let text = messy_progress_block(&task_id, progress_percent, &current_action);
        let parsed = parse_multiple(&text);
        prop_assert_eq!(parsed.results.len(), 1);
        let Some(PhasePayload::Progress(data)) = &parsed.results[0].payload else {
            prop_assert!(false, "expected a recovered Progress payload, got {:?}", parsed.results[0].error);
            unreachable!();
        };
        prop_assert_eq!(&data.task_id, &task_id);
        prop_assert_eq!(data.progress_percent, Some(progress_percent));
        prop_assert_eq!(data.current_action.as_deref(), Some(current_action.as_str()));
    }

    #[test]
    fn prose_before_and_after_the_block_is_preserved(
        before in "[A-Za-z .]{0,24}",
        after in "[A-Za-z .]{0,24}",
        task_id in "[a-z]{1,6}",
    ) {
        let block = messy_progress_block(&task_id, 50, "working");
        let text = format!("{before}{block}{after}");
        let parsed = parse_multiple(&text);
        prop_assert_eq!(parsed.before_text.as_str(), before.as_str());
        prop_assert_eq!(parsed.after_text.as_str(), after.as_str());
    }
}
