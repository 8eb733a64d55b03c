//! HMRC VAT return submission (HMRC-VAT-DEC).
//!
//! A declaration is sent once and answered with an acknowledgement naming a
//! poll endpoint. Polling with the correlation id from that acknowledgement
//! eventually yields the declaration response.

use chrono::{DateTime, NaiveDate, Utc};
use govtalk_client::{Client, GatewayConfig, HttpTransport, Transport};
use govtalk_core::{
    canon::CanonicalizationMode,
    digest::DigestMarker,
    message::{AuthType, Body, ChannelRoute, Qualifier},
    response::{ResponseEndpoint, ResponseEnvelope, child_elements, child_text, parse_timestamp, text_of},
    validate::{self, ValidationError},
    writer::XmlWriter,
};
use serde::Serialize;
use xmltree::{Element, XMLNode};

use crate::{DepartmentError, reject_errors};

pub const MESSAGE_CLASS: &str = "HMRC-VAT-DEC";
pub const SCHEMA_LOCATION: &str =
    "http://www.govtalk.gov.uk/taxation/vat/vatdeclaration/2/VATDeclarationRequest-v2-1.xsd";
pub const DECLARATION_NAMESPACE: &str = "http://www.govtalk.gov.uk/taxation/vat/vatdeclaration/2";

const ROUTE_URI: &str = "https://crates.io/crates/govtalk_departments";
const ROUTE_PRODUCT: &str = "govtalk_departments HMRC VAT";
const ROUTE_VERSION: &str = env!("CARGO_PKG_VERSION");
const DEFAULT_AGENT_COUNTRY: &str = "England";
const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VatService {
    #[default]
    Live,
    /// Third party validation service.
    Tpvs,
    /// Vendor self-serve integration service.
    Vsips,
}

impl VatService {
    pub fn endpoint(&self) -> &'static str {
        match self {
            VatService::Live => "https://secure.gateway.gov.uk/submission",
            VatService::Tpvs => "https://www.tpvs.hmrc.gov.uk/HMRC/VATDEC",
            VatService::Vsips => "https://secure.dev.gateway.gov.uk/submission",
        }
    }

    pub fn is_test(&self) -> bool {
        !matches!(self, VatService::Live)
    }
}

/// Figures for one VAT return, boxes 1 to 9.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VatReturn {
    pub vat_number: String,
    /// `YYYY-MM`
    pub period: String,
    pub sender_capacity: String,
    /// Box 1
    pub vat_due_on_outputs: f64,
    /// Box 2
    pub vat_due_on_ec_acquisitions: f64,
    /// Box 3, box 1 + box 2 when not given.
    pub total_vat: Option<f64>,
    /// Box 4
    pub vat_reclaimed_on_inputs: f64,
    /// Box 5, |box 3 - box 4| when not given.
    pub net_vat: Option<f64>,
    /// Box 6
    pub net_sales_and_outputs: f64,
    /// Box 7
    pub net_purchases_and_inputs: f64,
    /// Box 8
    pub net_ec_supplies: f64,
    /// Box 9
    pub net_ec_acquisitions: f64,
    pub final_return: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AgentAddress {
    pub lines: Vec<String>,
    pub postcode: String,
    /// England when not given.
    pub country: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AgentContact {
    pub title: String,
    pub forename: String,
    pub surname: String,
    pub email: Option<String>,
    pub telephone: Option<String>,
    pub fax: Option<String>,
}

/// Written into the IRheader when a return is filed on someone's behalf.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AgentDetails {
    pub reference: Option<String>,
    pub company: String,
    pub address: AgentAddress,
    pub contact: Option<AgentContact>,
}

/// Where and when to poll for the outcome of a submitted return.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Acknowledgement {
    pub endpoint: Option<ResponseEndpoint>,
    pub correlation_id: Option<String>,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub enum PollOutcome {
    Pending(Acknowledgement),
    Complete(DeclarationResponse),
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct DeclarationResponse {
    pub messages: Vec<String>,
    pub irmark_receipt: Option<String>,
    pub accepted_time: Option<DateTime<Utc>>,
    pub period: VatPeriod,
    pub payment: PaymentDetails,
}

#[derive(Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct VatPeriod {
    pub id: String,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct PaymentDetails {
    pub narrative: String,
    pub net_vat: Option<f64>,
    pub due_date: Option<NaiveDate>,
    pub method: PaymentMethod,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub enum PaymentMethod {
    NilPayment,
    Repayment,
    DirectDebit { collection_date: Option<NaiveDate> },
    Payment { instruction_status: String },
    /// A notification shape this crate does not know, with the names of the
    /// elements it held.
    Unknown { elements: Vec<String> },
}

pub struct HmrcVat<T> {
    client: Client<T>,
    generate_irmark: bool,
    agent: Option<AgentDetails>,
}

impl HmrcVat<HttpTransport> {
    pub fn new(sender_id: &str, password: &str, service: VatService) -> Result<Self, DepartmentError> {
        let client = Client::new(Self::config(sender_id, password, service)?)?;
        Ok(Self::from_client(client))
    }
}

impl<T> HmrcVat<T>
where
    T: Transport,
{
    pub fn with_transport(
        sender_id: &str,
        password: &str,
        service: VatService,
        transport: T,
    ) -> Result<Self, DepartmentError> {
        let config = Self::config(sender_id, password, service)?;
        Ok(Self::from_client(Client::with_transport(config, transport)))
    }

    fn config(sender_id: &str, password: &str, service: VatService) -> Result<GatewayConfig, DepartmentError> {
        Ok(GatewayConfig::new(service.endpoint(), sender_id, password)?
            .with_auth_type(AuthType::Clear)
            .with_test_flag(service.is_test())
            .with_schema_location(SCHEMA_LOCATION)?)
    }

    fn from_client(client: Client<T>) -> Self {
        Self {
            client,
            generate_irmark: true,
            agent: None,
        }
    }

    pub fn client(&self) -> &Client<T> {
        &self.client
    }

    pub fn set_irmark_generation(&mut self, generate: bool) {
        self.generate_irmark = generate;
    }

    pub fn set_agent_details(&mut self, agent: AgentDetails) {
        self.agent = Some(agent);
    }

    /// Submits a VAT return and returns where to poll for its outcome.
    pub async fn declaration_request(&mut self, vat_return: &VatReturn) -> Result<Acknowledgement, DepartmentError> {
        let vat_number = validate::vat_number(&vat_return.vat_number)?;
        let period = validate::vat_period(&vat_return.period)?;
        let capacity = validate::sender_capacity(&vat_return.sender_capacity)?;
        let boxes = Boxes::from_return(vat_return)?;

        let marker = self
            .generate_irmark
            .then(|| DigestMarker::new().with_mode(CanonicalizationMode::Inclusive));

        let mut body = XmlWriter::new();
        body.start_element("IRenvelope");
        body.attribute("xmlns", DECLARATION_NAMESPACE);

        body.start_element("IRheader");
        body.start_element("Keys");
        body.start_element("Key");
        body.attribute("Type", "VATRegNo");
        body.text(&vat_number);
        body.end_element(); // Key
        body.end_element(); // Keys
        body.write_element("PeriodID", period);
        if let Some(agent) = &self.agent {
            write_agent(&mut body, agent);
        }
        body.write_element("DefaultCurrency", "GBP");
        if let Some(marker) = &marker {
            marker.write_placeholder(&mut body);
        }
        body.write_element("Sender", capacity);
        body.end_element(); // IRheader

        body.start_element("VATDeclarationRequest");
        if vat_return.final_return {
            body.attribute("finalReturn", "yes");
        }
        boxes.write_to(&mut body);
        body.end_element(); // VATDeclarationRequest
        body.end_element(); // IRenvelope

        let mut envelope = self.client.envelope()?;
        envelope.set_class(MESSAGE_CLASS)?;
        envelope.set_qualifier("request")?;
        envelope.set_function("submit");
        envelope.add_key("VATRegNo", &vat_number);
        envelope.add_channel_route(
            ChannelRoute::new(ROUTE_URI)
                .product(ROUTE_PRODUCT)
                .version(ROUTE_VERSION),
        )?;
        envelope.set_digest(marker);
        envelope.set_body(Body::try_from(body)?);

        let response = self.client.send(envelope).await?;
        reject_errors(response)?;

        tracing::info!(%vat_number, period, "vat return submitted");
        Ok(acknowledgement(response))
    }

    /// Polls for the outcome of a submitted return. The correlation id
    /// defaults to the one in the last response; `poll_url` redirects this
    /// and later sends.
    pub async fn declaration_response_poll(
        &mut self,
        correlation_id: Option<&str>,
        poll_url: Option<&str>,
    ) -> Result<PollOutcome, DepartmentError> {
        let correlation_id = match correlation_id {
            Some(correlation_id) => correlation_id.to_owned(),
            None => self
                .client
                .response()
                .and_then(ResponseEnvelope::correlation_id)
                .ok_or(DepartmentError::MissingCorrelationId)?,
        };

        if let Some(poll_url) = poll_url {
            self.client.set_endpoint(poll_url)?;
        }

        let envelope = self.client.poll_envelope(MESSAGE_CLASS, &correlation_id)?;
        let response = self.client.send(envelope).await?;
        reject_errors(response)?;

        match response.qualifier() {
            Some(Qualifier::Response) => Ok(PollOutcome::Complete(parse_declaration_response(response)?)),
            Some(Qualifier::Acknowledgement) => Ok(PollOutcome::Pending(acknowledgement(response))),
            other => Err(DepartmentError::UnexpectedResponse(format!(
                "qualifier {}",
                other.map(|qualifier| qualifier.as_str()).unwrap_or("missing")
            ))),
        }
    }
}

/// Return figures after validation, with boxes 3 and 5 worked out.
struct Boxes {
    vat_due_on_outputs: f64,
    vat_due_on_ec_acquisitions: f64,
    total_vat: f64,
    vat_reclaimed_on_inputs: f64,
    net_vat: f64,
    net_sales_and_outputs: f64,
    net_purchases_and_inputs: f64,
    net_ec_supplies: f64,
    net_ec_acquisitions: f64,
}

impl Boxes {
    fn from_return(vat_return: &VatReturn) -> Result<Self, ValidationError> {
        let vat_due_on_outputs = validate::amount("VATDueOnOutputs", vat_return.vat_due_on_outputs)?;
        let vat_due_on_ec_acquisitions =
            validate::amount("VATDueOnECAcquisitions", vat_return.vat_due_on_ec_acquisitions)?;
        let vat_reclaimed_on_inputs =
            validate::amount("VATReclaimedOnInputs", vat_return.vat_reclaimed_on_inputs)?;

        let total_vat = match vat_return.total_vat {
            Some(total_vat) => validate::amount("TotalVAT", total_vat)?,
            None => vat_due_on_outputs + vat_due_on_ec_acquisitions,
        };
        let net_vat = match vat_return.net_vat {
            Some(net_vat) => validate::amount("NetVAT", net_vat)?,
            None => (total_vat - vat_reclaimed_on_inputs).abs(),
        };
        if net_vat < 0.0 {
            return Err(ValidationError::NegativeNetVat);
        }

        Ok(Self {
            vat_due_on_outputs,
            vat_due_on_ec_acquisitions,
            total_vat,
            vat_reclaimed_on_inputs,
            net_vat,
            net_sales_and_outputs: validate::amount("NetSalesAndOutputs", vat_return.net_sales_and_outputs)?,
            net_purchases_and_inputs: validate::amount(
                "NetPurchasesAndInputs",
                vat_return.net_purchases_and_inputs,
            )?,
            net_ec_supplies: validate::amount("NetECSupplies", vat_return.net_ec_supplies)?,
            net_ec_acquisitions: validate::amount("NetECAcquisitions", vat_return.net_ec_acquisitions)?,
        })
    }

    fn write_to(&self, writer: &mut XmlWriter) {
        let pence = |value: f64| format!("{value:.2}");
        let pounds = |value: f64| format!("{:.0}", value.floor());

        writer.write_element("VATDueOnOutputs", &pence(self.vat_due_on_outputs));
        writer.write_element("VATDueOnECAcquisitions", &pence(self.vat_due_on_ec_acquisitions));
        writer.write_element("TotalVAT", &pence(self.total_vat));
        writer.write_element("VATReclaimedOnInputs", &pence(self.vat_reclaimed_on_inputs));
        writer.write_element("NetVAT", &pence(self.net_vat));
        writer.write_element("NetSalesAndOutputs", &pounds(self.net_sales_and_outputs));
        writer.write_element("NetPurchasesAndInputs", &pounds(self.net_purchases_and_inputs));
        writer.write_element("NetECSupplies", &pounds(self.net_ec_supplies));
        writer.write_element("NetECAcquisitions", &pounds(self.net_ec_acquisitions));
    }
}

fn write_agent(writer: &mut XmlWriter, agent: &AgentDetails) {
    writer.start_element("Agent");
    if let Some(reference) = &agent.reference {
        writer.write_element("AgentID", reference);
    }
    writer.write_element("Company", &agent.company);

    writer.start_element("Address");
    for line in &agent.address.lines {
        writer.write_element("Line", line);
    }
    writer.write_element("PostCode", &agent.address.postcode);
    writer.write_element(
        "Country",
        agent.address.country.as_deref().unwrap_or(DEFAULT_AGENT_COUNTRY),
    );
    writer.end_element(); // Address

    if let Some(contact) = &agent.contact {
        writer.start_element("Contact");
        writer.start_element("Name");
        writer.write_element("Ttl", &contact.title);
        writer.write_element("Fore", &contact.forename);
        writer.write_element("Sur", &contact.surname);
        writer.end_element(); // Name
        for (name, value) in [
            ("Email", &contact.email),
            ("Telephone", &contact.telephone),
            ("Fax", &contact.fax),
        ] {
            if let Some(value) = value {
                writer.write_element(name, value);
            }
        }
        writer.end_element(); // Contact
    }

    writer.end_element(); // Agent
}

fn acknowledgement(response: &ResponseEnvelope) -> Acknowledgement {
    Acknowledgement {
        endpoint: response.endpoint(),
        correlation_id: response.correlation_id(),
    }
}

fn parse_declaration_response(response: &ResponseEnvelope) -> Result<DeclarationResponse, DepartmentError> {
    let missing = |what: &str| DepartmentError::UnexpectedResponse(format!("no {what} in response body"));

    let success = response
        .body()
        .and_then(|body| body.get_child("SuccessResponse"))
        .ok_or_else(|| missing("SuccessResponse"))?;
    let declaration = success
        .get_child("ResponseData")
        .and_then(|data| data.get_child("VATDeclarationResponse"))
        .ok_or_else(|| missing("VATDeclarationResponse"))?;

    let messages = child_elements(success, "Message").filter_map(text_of).collect();
    let irmark_receipt = success
        .get_child("IRmarkReceipt")
        .and_then(|receipt| child_text(receipt, "Message"));
    let accepted_time = child_text(success, "AcceptedTime").and_then(|time| parse_timestamp(&time));

    let period = declaration
        .get_child("Header")
        .and_then(|header| header.get_child("VATPeriod"))
        .map(|period| VatPeriod {
            id: child_text(period, "PeriodId").unwrap_or_default(),
            start: child_date(period, "PeriodStartDate"),
            end: child_date(period, "PeriodEndDate"),
        })
        .unwrap_or_default();

    let declaration_body = declaration
        .get_child("Body")
        .ok_or_else(|| missing("declaration Body"))?;
    let notification = declaration_body
        .get_child("PaymentNotification")
        .ok_or_else(|| missing("PaymentNotification"))?;

    let payment = PaymentDetails {
        narrative: child_text(notification, "Narrative").unwrap_or_default(),
        net_vat: child_text(notification, "NetVAT").and_then(|net_vat| net_vat.parse().ok()),
        due_date: child_date(declaration_body, "PaymentDueDate"),
        method: payment_method(notification),
    };

    Ok(DeclarationResponse {
        messages,
        irmark_receipt,
        accepted_time,
        period,
        payment,
    })
}

fn payment_method(notification: &Element) -> PaymentMethod {
    if notification.get_child("NilPaymentIndicator").is_some() {
        PaymentMethod::NilPayment
    } else if notification.get_child("RepaymentIndicator").is_some() {
        PaymentMethod::Repayment
    } else if let Some(status) = notification.get_child("DirectDebitPaymentStatus") {
        PaymentMethod::DirectDebit {
            collection_date: child_date(status, "CollectionDate"),
        }
    } else if let Some(request) = notification.get_child("PaymentRequest") {
        PaymentMethod::Payment {
            instruction_status: child_text(request, "DirectDebitInstructionStatus").unwrap_or_default(),
        }
    } else {
        PaymentMethod::Unknown {
            elements: notification
                .children
                .iter()
                .filter_map(XMLNode::as_element)
                .map(|element| element.name.clone())
                .collect(),
        }
    }
}

fn child_date(parent: &Element, name: &str) -> Option<NaiveDate> {
    let text = child_text(parent, name)?;
    NaiveDate::parse_from_str(&text, DATE_FORMAT).ok()
}
