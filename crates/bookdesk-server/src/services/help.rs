use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Faq {
    pub question: &'static str,
    pub answer: &'static str,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactKind {
    Email,
    Phone,
    Chat,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Contact {
    pub kind: ContactKind,
    pub label: &'static str,
    pub href: &'static str,
}

pub const FAQS: [Faq; 7] = [
    Faq {
        question: "What are the steps to reset my account password if I've forgotten it?",
        answer: "Choose 'Forgot password?' on the sign-in page and enter your email. If an account exists, a reset link is sent to that address.",
    },
    Faq {
        question: "How can I get in touch with customer support for urgent assistance?",
        answer: "You can email us at support@example.com or call our support line at (123) 456-7890.",
    },
    Faq {
        question: "How do I book a service?",
        answer: "Open 'Bookings', choose an available service and confirm. The booking stays Pending until an administrator reviews it.",
    },
    Faq {
        question: "When can I pay for a booking?",
        answer: "Once a booking is approved, a payment appears under 'Payments'. Enter your card details there to complete it.",
    },
    Faq {
        question: "Can I cancel a booking?",
        answer: "Pending bookings can be cancelled from the bookings table. Approved or rejected bookings can no longer be cancelled.",
    },
    Faq {
        question: "How do I change my email address or other account details?",
        answer: "Go to 'Profile' to update your details. Contact support if you need to change your email address.",
    },
    Faq {
        question: "Why can't I sign in to my account?",
        answer: "Check your email and password. If your account was deactivated by an administrator, contact support.",
    },
];

pub const CONTACTS: [Contact; 3] = [
    Contact {
        kind: ContactKind::Email,
        label: "support@example.com",
        href: "mailto:support@example.com",
    },
    Contact {
        kind: ContactKind::Phone,
        label: "(123) 456-7890",
        href: "tel:+11234567890",
    },
    Contact {
        kind: ContactKind::Chat,
        label: "Live Chat Support",
        href: "/support/chat",
    },
];

/// FAQs whose question contains `search`, ignoring case.
pub fn search_faqs(search: Option<&str>) -> Vec<Faq> {
    let needle = search.map(str::trim).unwrap_or_default().to_lowercase();
    FAQS.iter()
        .filter(|faq| faq.question.to_lowercase().contains(&needle))
        .copied()
        .collect()
}
