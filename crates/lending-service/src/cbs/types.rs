//! SOAP envelopes and typed records for the core banking system.
//!
//! Responses are read with a pull parser. Each record element (`customer`,
//! `transaction`) is flattened into its direct child elements; the typed
//! conversion then picks the fields it knows and ignores the rest.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use lending_core::{CustomerKyc, CustomerTransaction, UNKNOWN_ACCOUNT_STATUS};
use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;
use rust_decimal::Decimal;

use super::client::CbsError;

// ============================================================================
// Constants
// ============================================================================

/// SOAP 1.1 envelope namespace.
pub const SOAP_ENV_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";

/// Namespace of the KYC service.
pub const KYC_NS: &str = "http://credable.io/cbs/customer";

/// Namespace of the transactions service.
pub const TRANSACTIONS_NS: &str = "http://credable.io/cbs/transaction";

/// KYC operation name.
pub const KYC_OPERATION: &str = "getCustomerKYC";

/// Transactions operation name.
pub const TRANSACTIONS_OPERATION: &str = "getCustomerTransactions";

/// Element wrapping one KYC record.
pub const CUSTOMER_ELEMENT: &str = "customer";

/// Element wrapping one transaction record.
pub const TRANSACTION_ELEMENT: &str = "transaction";

/// A flattened record: child element name to text.
pub type Record = HashMap<String, String>;

// ============================================================================
// Requests
// ============================================================================

/// Build the SOAP request for a per-customer operation.
#[must_use]
pub fn build_envelope(
    namespace: &str,
    operation: &str,
    customer_number: &str,
    username: &str,
    password: &str,
) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8"?>"#,
            r#"<soapenv:Envelope xmlns:soapenv="{env}" xmlns:cbs="{ns}">"#,
            "<soapenv:Header/>",
            "<soapenv:Body>",
            "<cbs:{op}>",
            "<cbs:customerNumber>{customer}</cbs:customerNumber>",
            "<cbs:username>{username}</cbs:username>",
            "<cbs:password>{password}</cbs:password>",
            "</cbs:{op}>",
            "</soapenv:Body>",
            "</soapenv:Envelope>"
        ),
        env = SOAP_ENV_NS,
        ns = escape(namespace),
        op = operation,
        customer = escape(customer_number),
        username = escape(username),
        password = escape(password),
    )
}

// ============================================================================
// Responses
// ============================================================================

/// Collect every `record_element` in the document as a flat record.
///
/// # Errors
///
/// - `CbsError::Fault` if the body is a SOAP fault.
/// - `CbsError::Xml` if the document is malformed.
pub fn parse_records(xml: &str, record_element: &str) -> Result<Vec<Record>, CbsError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut records = Vec::new();
    let mut current: Option<Record> = None;
    // Depth inside the current record: 1 = record element, 2 = a field.
    let mut depth = 0usize;
    let mut field: Option<String> = None;
    let mut in_fault = false;
    let mut fault_field: Option<String> = None;
    let mut fault_message: Option<String> = None;

    loop {
        let text = match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();

                if current.is_some() {
                    depth += 1;
                    if depth == 2 {
                        field = Some(name);
                    }
                } else if name == record_element {
                    current = Some(Record::new());
                    depth = 1;
                } else if name == "Fault" {
                    in_fault = true;
                } else if in_fault {
                    fault_field = Some(name);
                }
                continue;
            }
            Ok(Event::Empty(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                if current.is_none() && name == record_element {
                    records.push(Record::new());
                }
                continue;
            }
            Ok(Event::Text(t)) => t
                .unescape()
                .map_err(|e| CbsError::Xml(e.to_string()))?
                .into_owned(),
            Ok(Event::CData(c)) => String::from_utf8_lossy(&c.into_inner()).into_owned(),
            Ok(Event::End(_)) => {
                if current.is_some() {
                    if depth == 2 {
                        field = None;
                    }
                    depth -= 1;
                    if depth == 0 {
                        records.extend(current.take());
                    }
                } else if in_fault {
                    fault_field = None;
                }
                continue;
            }
            Ok(Event::Eof) => break,
            Ok(_) => continue,
            Err(e) => return Err(CbsError::Xml(e.to_string())),
        };

        // A field may arrive as several text and CDATA segments.
        if let (Some(record), Some(name)) = (current.as_mut(), field.as_ref()) {
            if depth == 2 {
                record.entry(name.clone()).or_default().push_str(&text);
            }
        } else if in_fault && fault_field.as_deref() == Some("faultstring") {
            fault_message.get_or_insert_with(String::new).push_str(&text);
        }
    }

    if in_fault {
        return Err(CbsError::Fault(
            fault_message.unwrap_or_else(|| "unspecified SOAP fault".into()),
        ));
    }

    Ok(records)
}

fn take(record: &mut Record, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|k| record.remove(*k))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Convert a KYC record.
#[must_use]
pub fn kyc_from_record(mut record: Record, requested_customer: &str) -> CustomerKyc {
    let customer_name = take(&mut record, &["customerName"]).unwrap_or_else(|| {
        ["firstName", "middleName", "lastName"]
            .iter()
            .filter_map(|k| take(&mut record, &[*k]))
            .collect::<Vec<_>>()
            .join(" ")
    });

    CustomerKyc {
        customer_number: take(&mut record, &["customerNumber"])
            .unwrap_or_else(|| requested_customer.to_string()),
        customer_name,
        account_status: take(&mut record, &["accountStatus", "status"])
            .unwrap_or_else(|| UNKNOWN_ACCOUNT_STATUS.to_string()),
        id_number: take(&mut record, &["idNumber"]),
        mobile: take(&mut record, &["mobile"]),
        email: take(&mut record, &["email"]),
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

/// Convert a transaction record.
///
/// # Errors
///
/// Returns the name of the first required field that is missing or malformed.
pub fn transaction_from_record(
    mut record: Record,
    customer_number: &str,
) -> Result<CustomerTransaction, &'static str> {
    let account_number = take(&mut record, &["accountNumber"]).ok_or("accountNumber")?;
    let timestamp = take(&mut record, &["transactionDate", "timestamp"])
        .as_deref()
        .and_then(parse_timestamp)
        .ok_or("transactionDate")?;
    let amount = take(&mut record, &["amount", "transactionAmount"])
        .and_then(|a| a.parse::<Decimal>().ok())
        .ok_or("amount")?;
    let transaction_type =
        take(&mut record, &["transactionType", "type"]).ok_or("transactionType")?;

    Ok(CustomerTransaction {
        customer_number: customer_number.to_string(),
        account_number,
        timestamp,
        amount,
        transaction_type,
    })
}
