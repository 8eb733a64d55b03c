#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use govtalk_core::{
    envelope::Envelope,
    message::{AuthType, Credentials},
};
use xmltree::Element;

pub const SENDER_ID: &str = "XMLGatewayTestUserID";
pub const PASSWORD: &str = "XMLGatewayTestPassword";

pub fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2009, 4, 1, 12, 30, 0).unwrap()
}

/// An envelope with every mandatory field set and clear authentication.
pub fn ready_envelope(body: &str) -> Envelope {
    let mut envelope = Envelope::new();
    envelope.set_class("HMRC-VAT-DEC").unwrap();
    envelope.set_qualifier("request").unwrap();
    envelope.set_function("submit");
    envelope.set_credentials(Credentials::new(SENDER_ID, PASSWORD));
    envelope.set_authentication(AuthType::Clear);
    envelope.set_body(body);
    envelope
}

pub fn parse(xml: &str) -> Element {
    Element::parse(xml.as_bytes()).unwrap()
}

pub fn path<'a>(root: &'a Element, names: &[&str]) -> &'a Element {
    names.iter().fold(root, |element, name| {
        element
            .get_child(*name)
            .unwrap_or_else(|| panic!("missing {name}"))
    })
}

pub fn text(root: &Element, names: &[&str]) -> String {
    path(root, names)
        .get_text()
        .map(|text| text.trim().to_owned())
        .unwrap_or_default()
}

pub const ACKNOWLEDGEMENT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<GovTalkMessage xmlns="http://www.govtalk.gov.uk/CM/envelope">
 <EnvelopeVersion>2.0</EnvelopeVersion>
 <Header>
  <MessageDetails>
   <Class>HMRC-VAT-DEC</Class>
   <Qualifier>acknowledgement</Qualifier>
   <Function>submit</Function>
   <TransactionID>1238589000000000</TransactionID>
   <CorrelationID>A1B2C3D4E5F60718293A4B5C6D7E8F90</CorrelationID>
   <ResponseEndPoint PollInterval="10">https://secure.gateway.gov.uk/poll</ResponseEndPoint>
   <GatewayTimestamp>2009-04-01T12:30:05.123</GatewayTimestamp>
  </MessageDetails>
  <SenderDetails/>
 </Header>
 <GovTalkDetails>
  <Keys/>
 </GovTalkDetails>
 <Body/>
</GovTalkMessage>
"#;

pub const ERROR_RESPONSE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<GovTalkMessage xmlns="http://www.govtalk.gov.uk/CM/envelope">
 <EnvelopeVersion>2.0</EnvelopeVersion>
 <Header>
  <MessageDetails>
   <Class>HMRC-VAT-DEC</Class>
   <Qualifier>error</Qualifier>
   <Function>submit</Function>
   <TransactionID>1238589000000001</TransactionID>
   <CorrelationID></CorrelationID>
   <GatewayTimestamp>2009-04-01T12:30:05+01:00</GatewayTimestamp>
  </MessageDetails>
  <SenderDetails/>
 </Header>
 <GovTalkDetails>
  <Keys/>
  <GovTalkErrors>
   <Error>
    <RaisedBy>Gateway</RaisedBy>
    <Number>1002</Number>
    <Type>fatal</Type>
    <Text>Authentication Failure. The supplied user credentials failed validation for the requested service.</Text>
    <Location></Location>
   </Error>
   <Error>
    <RaisedBy>Department</RaisedBy>
    <Number>3001</Number>
    <Type>business</Type>
    <Text>The submission of this document has failed due to departmental specific business logic in the Body tag.</Text>
    <Location>/GovTalkMessage/Body/IRenvelope/VATDeclarationRequest/TotalVAT</Location>
   </Error>
   <Error Type="warning">
    <Number>4000</Number>
    <Text>Gateway test mode.</Text>
   </Error>
   <Error>
    <Number>9999</Number>
    <Type>catastrophic</Type>
    <Text>Unheard of.</Text>
   </Error>
  </GovTalkErrors>
 </GovTalkDetails>
 <Body/>
</GovTalkMessage>
"#;
