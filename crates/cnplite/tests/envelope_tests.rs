use cnplite::{Backend, Error, ErrorKind, RawResponse, Response, Result, Value};

const ROOT: &str = "cnpOnlineResponse";

const APPROVED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<cnpOnlineResponse version="12.0" xmlns="http://www.vantivcnp.com/schema" response="0" message="Valid Format">
  <authorizationResponse id="1" reportGroup="Web" orderId="01">
    <cnpTxnId>84568456</cnpTxnId>
    <response>000</response>
    <message>Approved</message>
    <fraudResult>
      <avsResult>00</avsResult>
    </fraudResult>
  </authorizationResponse>
</cnpOnlineResponse>
"#;

fn each_backend<F>(raw: &RawResponse, check: F) -> Result<()>
where
    F: Fn(Backend, &RawResponse) -> Result<()>,
{
    Backend::ALL.into_iter().try_for_each(|backend| check(backend, raw))
}

#[test]
fn test_success_path() -> Result<()> {
    let raw = RawResponse::new(
        200,
        r#"<cnpOnlineResponse response="0"><authorizationResponse orderId="01"/></cnpOnlineResponse>"#,
    );
    each_backend(&raw, |backend, raw| {
        let response = Response::new(raw, &["authorizationResponse"], ROOT, backend.parser().as_ref())?;
        assert_eq!(response.get("orderId"), Some(&Value::from("01")), "{backend}");
        assert!(response.is_success());
        Ok(())
    })
}

#[test]
fn test_pretty_printed_response_extraction() -> Result<()> {
    let raw = RawResponse::new(200, APPROVED);
    each_backend(&raw, |backend, raw| {
        let parser = backend.parser();
        let response = Response::new(raw, &["authorizationResponse"], ROOT, parser.as_ref())?;
        assert_eq!(response["cnpTxnId"], Value::from("84568456"), "{backend}");
        assert_eq!(response["orderId"], Value::from("01"), "{backend}");
        assert_eq!(
            response.dig(&["fraudResult", "avsResult"])?,
            Some(&Value::from("00")),
            "{backend}"
        );

        let keys: Vec<&str> = response.iter().map(|(k, _)| k.as_str()).collect();
        assert!(keys.contains(&"message"), "{backend}: {keys:?}");
        Ok(())
    })
}

#[test]
fn test_whole_root_exposed_without_path() -> Result<()> {
    let raw = RawResponse::new(200, APPROVED);
    each_backend(&raw, |backend, raw| {
        let response = Response::new(raw, &[] as &[&str], ROOT, backend.parser().as_ref())?;
        assert_eq!(response["response"], Value::from("0"));
        assert_eq!(response["message"], Value::from("Valid Format"));
        assert_eq!(response["xmlns"], Value::from("http://www.vantivcnp.com/schema"));
        assert!(response["authorizationResponse"].is_node(), "{backend}");
        Ok(())
    })
}

#[test]
fn test_http_status_failure() -> Result<()> {
    let raw = RawResponse::new(404, "<html>not found</html>");
    each_backend(&raw, |backend, raw| {
        let err = Response::new(raw, &["x"], ROOT, backend.parser().as_ref()).err();
        assert_eq!(err.as_ref().map(Error::kind), Some(ErrorKind::Server));
        assert_eq!(
            err.map(|e| e.message().to_owned()).as_deref(),
            Some("server responded with 404 instead of 200")
        );
        Ok(())
    })
}

#[test]
fn test_declined_response() -> Result<()> {
    let raw = RawResponse::new(
        200,
        r#"<cnpOnlineResponse response="20" message="Error"/>"#,
    );
    each_backend(&raw, |backend, raw| {
        let err = Response::new(raw, &["saleResponse"], ROOT, backend.parser().as_ref()).err();
        assert_eq!(err, Some(Error::server("Error")), "{backend}");
        Ok(())
    })
}

#[test]
fn test_missing_root() -> Result<()> {
    let raw = RawResponse::new(200, r#"<litleOnlineResponse response="0"/>"#);
    each_backend(&raw, |backend, raw| {
        let err = Response::new(raw, &["saleResponse"], ROOT, backend.parser().as_ref()).err();
        assert_eq!(err.as_ref().map(Error::kind), Some(ErrorKind::Server));
        assert!(err.is_some_and(|e| e.message().contains(ROOT)), "{backend}");
        Ok(())
    })
}

#[test]
fn test_lenient_records_decline() -> Result<()> {
    let raw = RawResponse::new(
        200,
        r#"<cnpOnlineResponse response="1" message="System Error"><saleResponse/></cnpOnlineResponse>"#,
    );
    each_backend(&raw, |backend, raw| {
        let response = Response::lenient(raw, &["saleResponse"], ROOT, backend.parser().as_ref())?;
        assert!(!response.is_success());
        assert_eq!(response.error_message(), Some("System Error"), "{backend}");
        assert_eq!(response["response"], Value::from("1"));
        Ok(())
    })
}

#[test]
fn test_sequence_indexing() -> Result<()> {
    let raw = RawResponse::new(
        200,
        "<cnpOnlineResponse response='0'>\
         <saleResponse><orderId>1</orderId></saleResponse>\
         <saleResponse><orderId>2</orderId></saleResponse>\
         </cnpOnlineResponse>",
    );
    each_backend(&raw, |backend, raw| {
        let parser = backend.parser();
        let response = Response::new(raw, &["saleResponse"], ROOT, parser.as_ref())?;
        assert_eq!(response.dig(&["1", "orderId"])?, Some(&Value::from("2")));

        let err = response.dig(&["orderId"]).err();
        assert_eq!(err.map(|e| e.kind()), Some(ErrorKind::Type), "{backend}");
        Ok(())
    })
}
