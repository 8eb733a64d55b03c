#![allow(dead_code)]

use govtalk_client::GatewayConfig;

pub const GATEWAY: &str = "https://secure.dev.gateway.gov.uk/submission";

pub fn config() -> GatewayConfig {
    GatewayConfig::new(GATEWAY, "VATDEC180a01", "testing1").unwrap()
}

pub fn acknowledgement(correlation_id: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<GovTalkMessage xmlns="http://www.govtalk.gov.uk/CM/envelope">
 <EnvelopeVersion>2.0</EnvelopeVersion>
 <Header>
  <MessageDetails>
   <Class>HMRC-VAT-DEC</Class>
   <Qualifier>acknowledgement</Qualifier>
   <Function>submit</Function>
   <TransactionID>1</TransactionID>
   <CorrelationID>{correlation_id}</CorrelationID>
   <ResponseEndPoint PollInterval="10">https://secure.dev.gateway.gov.uk/poll</ResponseEndPoint>
   <GatewayTimestamp>2009-04-01T12:30:05.123</GatewayTimestamp>
  </MessageDetails>
  <SenderDetails/>
 </Header>
 <GovTalkDetails><Keys/></GovTalkDetails>
 <Body/>
</GovTalkMessage>
"#
    )
}

pub const AUTHENTICATION_FAILURE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<GovTalkMessage xmlns="http://www.govtalk.gov.uk/CM/envelope">
 <EnvelopeVersion>2.0</EnvelopeVersion>
 <Header>
  <MessageDetails>
   <Class>HMRC-VAT-DEC</Class>
   <Qualifier>error</Qualifier>
   <Function>submit</Function>
   <TransactionID>1</TransactionID>
   <GatewayTimestamp>2009-04-01T12:30:05.123</GatewayTimestamp>
  </MessageDetails>
  <SenderDetails/>
 </Header>
 <GovTalkDetails>
  <Keys/>
  <GovTalkErrors>
   <Error>
    <RaisedBy>Gateway</RaisedBy>
    <Number>1046</Number>
    <Type>fatal</Type>
    <Text>Authentication Failure. The supplied user credentials failed validation for the requested service.</Text>
    <Location/>
   </Error>
  </GovTalkErrors>
 </GovTalkDetails>
 <Body/>
</GovTalkMessage>
"#;
