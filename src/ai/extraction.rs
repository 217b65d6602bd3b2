//! Turns free text like "burger 250 rs" into an item, amount and category.

use serde_json::{Map, Value};

use crate::{
    ai::{AiError, ChatMessage, CompletionRequest},
    expense::round_to_cents,
};

/// The categories the completion service is asked to choose from.
pub const SUGGESTED_CATEGORIES: [&str; 9] = [
    "Food",
    "Transport",
    "Shopping",
    "Bills",
    "Health",
    "Entertainment",
    "Education",
    "Housing",
    "Others",
];

/// Used when the completion has no item name.
pub const DEFAULT_ITEM: &str = "Miscellaneous";

/// Used when the completion has no category.
pub const DEFAULT_CATEGORY: &str = "Others";

const SYSTEM_PROMPT: &str = "You are a precise JSON extractor. You output only valid JSON.";

/// An expense read from free text, not yet saved.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseCandidate {
    /// What was bought, e.g. "Burger".
    pub item: String,
    /// How much was spent.
    pub amount: f64,
    /// The name of the category, e.g. "Food".
    pub category: String,
}

/// Build the request asking for `text` to be converted into an expense.
pub(crate) fn extraction_request(text: &str) -> CompletionRequest {
    let categories = SUGGESTED_CATEGORIES.join("/");
    let prompt = format!(
        "Extract expense details from this text: \"{text}\"\n\
        \n\
        Return ONLY a raw JSON object (no markdown, no backticks) with this exact format:\n\
        {{\"item\": \"capitalized name of item\", \"amount\": numeric_value, \"category\": \"{categories}\"}}\n\
        \n\
        Rules:\n\
        1. If a currency symbol (Rs, $, etc) is present, strip it. Use only numbers.\n\
        2. Categorize intelligently. If not clear, use \"{DEFAULT_CATEGORY}\".\n\
        3. Do NOT add any explanation, preambles, or markdown formatting. Just the JSON string.\n\
        4. If multiple amounts are mentioned, sum them up if they belong to the same logical \
        expense, or pick the main one."
    );

    CompletionRequest {
        messages: vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(prompt)],
        temperature: 0.1,
        max_tokens: None,
    }
}

/// The text from the first `{` to the last `}`, or all of `completion` if
/// there is no such span.
fn find_json_object(completion: &str) -> &str {
    match (completion.find('{'), completion.rfind('}')) {
        (Some(start), Some(end)) if start < end => &completion[start..=end],
        _ => completion,
    }
}

fn read_text_field(object: &Map<String, Value>, key: &str, default: &str) -> String {
    object
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .unwrap_or(default)
        .to_owned()
}

fn read_amount(object: &Map<String, Value>) -> Result<f64, AiError> {
    match object.get("amount") {
        None | Some(Value::Null) => Ok(0.0),
        Some(Value::Number(number)) => number
            .as_f64()
            .ok_or_else(|| AiError::InvalidAmount(number.to_string())),
        Some(Value::String(text)) => {
            // Drops currency symbols and thousands separators, e.g. "Rs. 1,500".
            let digits: String = text
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.')
                .collect();
            let digits = digits.trim_matches('.');

            digits
                .parse()
                .map_err(|_| AiError::InvalidAmount(text.to_owned()))
        }
        Some(other) => Err(AiError::InvalidAmount(other.to_string())),
    }
}

/// Read an [ExpenseCandidate] from the completion service's response.
///
/// # Errors
/// Returns an [AiError] if the response has no JSON object or the amount is
/// not a number.
pub(crate) fn parse_candidate(completion: &str) -> Result<ExpenseCandidate, AiError> {
    let json = find_json_object(completion.trim());
    let value: Value = serde_json::from_str(json)?;

    let object = match value {
        Value::Object(object) => object,
        other => return Err(AiError::NotAnObject(other.to_string())),
    };

    Ok(ExpenseCandidate {
        item: read_text_field(&object, "item", DEFAULT_ITEM),
        amount: round_to_cents(read_amount(&object)?),
        category: read_text_field(&object, "category", DEFAULT_CATEGORY),
    })
}

#[cfg(test)]
mod parse_candidate_tests {
    use crate::ai::{AiError, ExpenseCandidate, Role};

    use super::{extraction_request, find_json_object, parse_candidate};

    #[test]
    fn parses_plain_json() {
        let got = parse_candidate(r#"{"item": "Burger", "amount": 250, "category": "Food"}"#);

        assert_eq!(
            got.unwrap(),
            ExpenseCandidate {
                item: "Burger".to_owned(),
                amount: 250.0,
                category: "Food".to_owned()
            }
        );
    }

    #[test]
    fn finds_object_inside_prose_and_code_fences() {
        let completion = "Sure! Here you go:\n```json\n{\n  \"item\": \"Taxi\",\n  \
            \"amount\": 320.5,\n  \"category\": \"Transport\"\n}\n```\nHope that helps.";

        let got = parse_candidate(completion).unwrap();

        assert_eq!(got.item, "Taxi");
        assert_eq!(got.amount, 320.5);
        assert_eq!(got.category, "Transport");
    }

    #[test]
    fn strips_currency_from_string_amount() {
        let got = parse_candidate(r#"{"item": "Rent", "amount": "Rs. 12,500", "category": "Housing"}"#)
            .unwrap();

        assert_eq!(got.amount, 12500.0);
    }

    #[test]
    fn fills_in_missing_fields() {
        let got = parse_candidate(r#"{"item": "  ", "category": ""}"#).unwrap();

        assert_eq!(
            got,
            ExpenseCandidate {
                item: "Miscellaneous".to_owned(),
                amount: 0.0,
                category: "Others".to_owned()
            }
        );
    }

    #[test]
    fn object_span_is_greedy() {
        assert_eq!(
            find_json_object(r#"a {"item": {"x": 1}} b } c"#),
            r#"{"item": {"x": 1}} b }"#
        );
        assert_eq!(find_json_object("} nothing {"), "} nothing {");
        assert_eq!(find_json_object("no braces"), "no braces");
    }

    #[test]
    fn no_json_is_an_error() {
        let got = parse_candidate("I could not find an expense in that text.");

        assert!(matches!(got, Err(AiError::InvalidJson(_))));
    }

    #[test]
    fn array_is_not_an_object() {
        let got = parse_candidate("[1, 2, 3]");

        assert!(matches!(got, Err(AiError::NotAnObject(_))));
    }

    #[test]
    fn unreadable_amount_is_an_error() {
        for completion in [
            r#"{"item": "Tea", "amount": "free", "category": "Food"}"#,
            r#"{"item": "Tea", "amount": true, "category": "Food"}"#,
        ] {
            let got = parse_candidate(completion);

            assert!(
                matches!(got, Err(AiError::InvalidAmount(_))),
                "want invalid amount for {completion}, got {got:?}"
            );
        }
    }

    #[test]
    fn request_quotes_text_and_lists_categories() {
        let request = extraction_request("Bus ticket 45");

        assert_eq!(request.temperature, 0.1);
        assert_eq!(request.max_tokens, None);
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, Role::System);
        let prompt = &request.messages[1].content;
        assert!(prompt.contains("\"Bus ticket 45\""));
        assert!(prompt.contains(
            "Food/Transport/Shopping/Bills/Health/Entertainment/Education/Housing/Others"
        ));
    }
}
