#![allow(dead_code)]

use xmltree::Element;

pub fn parse(xml: &str) -> Element {
    Element::parse(xml.as_bytes()).unwrap()
}

pub fn text(root: &Element, names: &[&str]) -> String {
    names
        .iter()
        .fold(root, |element, name| {
            element
                .get_child(*name)
                .unwrap_or_else(|| panic!("missing {name}"))
        })
        .get_text()
        .map(|text| text.trim().to_owned())
        .unwrap_or_default()
}

/// Element names of the children of the element at `names`, in order.
pub fn child_names(root: &Element, names: &[&str]) -> Vec<String> {
    names
        .iter()
        .fold(root, |element, name| element.get_child(*name).unwrap())
        .children
        .iter()
        .filter_map(|node| node.as_element())
        .map(|element| element.name.clone())
        .collect()
}

pub fn envelope(qualifier: &str, correlation_id: &str, details: &str, body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<GovTalkMessage xmlns="http://www.govtalk.gov.uk/CM/envelope">
 <EnvelopeVersion>2.0</EnvelopeVersion>
 <Header>
  <MessageDetails>
   <Class>HMRC-VAT-DEC</Class>
   <Qualifier>{qualifier}</Qualifier>
   <Function>submit</Function>
   <TransactionID>1</TransactionID>
   <CorrelationID>{correlation_id}</CorrelationID>
   <ResponseEndPoint PollInterval="10">https://secure.dev.gateway.gov.uk/poll</ResponseEndPoint>
   <GatewayTimestamp>2009-04-01T12:30:05.123</GatewayTimestamp>
  </MessageDetails>
  <SenderDetails/>
 </Header>
 <GovTalkDetails>
  <Keys/>
  {details}
 </GovTalkDetails>
 <Body>{body}</Body>
</GovTalkMessage>
"#
    )
}

pub fn acknowledgement(correlation_id: &str) -> String {
    envelope("acknowledgement", correlation_id, "", "")
}

pub fn business_error() -> String {
    envelope(
        "error",
        "",
        "<GovTalkErrors><Error><RaisedBy>Department</RaisedBy><Number>3001</Number><Type>business</Type><Text>Invalid company name</Text></Error></GovTalkErrors>",
        "",
    )
}

pub fn name_search_response() -> String {
    envelope(
        "response",
        "",
        "",
        r#"
  <NameSearch xmlns="http://xmlgw.companieshouse.gov.uk/v1-0/schema">
   <ContinuationKey>abc</ContinuationKey>
   <SearchRows>3</SearchRows>
   <CoSearchItem>
    <CompanyName>FUBRA LIMITED</CompanyName>
    <CompanyNumber>04319391</CompanyNumber>
    <DataSet>LIVE</DataSet>
    <CompanyIndexStatus/>
    <SearchMatch>EXACT</SearchMatch>
   </CoSearchItem>
   <CoSearchItem>
    <CompanyName>FUBRA HOLDINGS LIMITED</CompanyName>
    <CompanyNumber>06000001</CompanyNumber>
    <DataSet>LIVE</DataSet>
    <SearchMatch>NEAR</SearchMatch>
   </CoSearchItem>
   <CoSearchItem>
    <CompanyName>FUBRAS LIMITED</CompanyName>
    <CompanyNumber>06000002</CompanyNumber>
    <DataSet>LIVE</DataSet>
   </CoSearchItem>
  </NameSearch>
 "#,
    )
}

pub fn declaration_response(payment_notification: &str) -> String {
    envelope(
        "response",
        "A1B2C3D4E5F60718293A4B5C6D7E8F90",
        "",
        &format!(
            r#"
  <SuccessResponse xmlns="http://www.inlandrevenue.gov.uk/SuccessResponse">
   <IRmarkReceipt>
    <Message code="0000">HMRC has received the HMRC-VAT-DEC document ref: 999900001 at 12.30 on 01/04/2009. The associated IRmark was: ABCDEFGHIJKLMNOPQRSTUVWXYZ234567.</Message>
   </IRmarkReceipt>
   <Message code="0000">Thank you for your submission</Message>
   <Message code="0001">Your return has been accepted</Message>
   <AcceptedTime>2009-04-01T12:30:05</AcceptedTime>
   <ResponseData>
    <VATDeclarationResponse xmlns="http://www.govtalk.gov.uk/taxation/vat/vatdeclarationresponse/2">
     <Header>
      <VATPeriod>
       <PeriodId>2009-03</PeriodId>
       <PeriodStartDate>2009-01-01</PeriodStartDate>
       <PeriodEndDate>2009-03-31</PeriodEndDate>
      </VATPeriod>
      <CurrencyCode>GBP</CurrencyCode>
      <SubmissionTimestamp>2009-04-01T12:30:05</SubmissionTimestamp>
     </Header>
     <Body>
      <PaymentDueDate>2009-05-07</PaymentDueDate>
      <PaymentNotification>
       <Narrative>Your VAT payment is due</Narrative>
       <NetVAT>1234.56</NetVAT>
       {payment_notification}
      </PaymentNotification>
     </Body>
    </VATDeclarationResponse>
   </ResponseData>
  </SuccessResponse>
 "#
        ),
    )
}
